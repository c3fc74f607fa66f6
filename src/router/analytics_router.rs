use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::handler::analytics_handler::{camera_performance_handler, dashboard_handler};
use crate::middlewares::{authorize, Guard};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::dashboard_service::DashboardServiceImpl;

pub fn analytics_router(service: Arc<DashboardServiceImpl>, auth: Arc<AuthServiceImpl>) -> Router {
    Router::new()
        .route("/analytics/dashboard", get(dashboard_handler))
        .route("/analytics/camera-performance", get(camera_performance_handler))
        .route_layer(middleware::from_fn_with_state(Guard::authenticated(auth), authorize))
        .with_state(service)
}
