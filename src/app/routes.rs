use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::{AppConfig, AppEnv, RateLimitConfig};
use crate::handler::ws_handler::WsState;
use crate::middlewares::{expose_error_details, rate_limit, RateLimiter};
use crate::realtime::RealtimeHub;
use crate::router::{
    ai_router::ai_router, analytics_router::analytics_router, auth_router::auth_router, camera_router::camera_router,
    incident_router::incident_router, manager_router::manager_router, payout_router::payout_router,
    report_router::report_router, ws_router::ws_router,
};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::camera_service::CameraServiceImpl;
use crate::service::dashboard_service::DashboardServiceImpl;
use crate::service::detection_service::DetectionServiceImpl;
use crate::service::incident_service::IncidentServiceImpl;
use crate::service::manager_service::ManagerServiceImpl;
use crate::service::payout_service::PayoutServiceImpl;
use crate::service::report_service::ReportServiceImpl;
use crate::util::error::HandlerError;
use crate::util::redis::RedisServiceTrait;
use crate::util::time;

/// Everything the router needs, already wired to its stores
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthServiceImpl>,
    pub cameras: Arc<CameraServiceImpl>,
    pub incidents: Arc<IncidentServiceImpl>,
    pub detections: Arc<DetectionServiceImpl>,
    pub reports: Arc<ReportServiceImpl>,
    pub payouts: Arc<PayoutServiceImpl>,
    pub managers: Arc<ManagerServiceImpl>,
    pub dashboard: Arc<DashboardServiceImpl>,
    pub hub: Arc<RealtimeHub>,
    pub redis: Arc<dyn RedisServiceTrait>,
}

async fn health(State(env): State<AppEnv>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "env": env.as_str(),
        "timestamp": time::now(),
    }))
}

async fn wake() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "Awake" }))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    error!(panic = %details, "Handler panicked");
    HandlerError::internal(details).into_response()
}

async fn not_found() -> HandlerError {
    HandlerError::not_found("Route not found")
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(frontend_url = %frontend_url, "Invalid FRONTEND_URL, cross-origin requests disabled: {}", e);
            layer
        }
    }
}

pub fn build_router(services: &AppServices, config: &AppConfig, limits: &RateLimitConfig) -> Router {
    let api_limiter = RateLimiter::api(services.redis.clone(), limits);
    let webhook_limiter = RateLimiter::webhook(services.redis.clone(), limits);
    let auth = services.auth.clone();

    let api = Router::new()
        .merge(auth_router(auth.clone()))
        .merge(camera_router(services.cameras.clone(), auth.clone(), config.max_upload_bytes()))
        .merge(incident_router(services.incidents.clone(), auth.clone()))
        .merge(report_router(services.reports.clone(), auth.clone()))
        .merge(payout_router(services.payouts.clone(), auth.clone()))
        .merge(manager_router(services.managers.clone(), auth.clone()))
        .merge(analytics_router(services.dashboard.clone(), auth.clone()))
        .route_layer(axum::middleware::from_fn_with_state(api_limiter.clone(), rate_limit))
        .merge(ai_router(services.detections.clone(), auth.clone(), webhook_limiter, api_limiter));

    let ws_state = Arc::new(WsState {
        auth,
        dashboard: services.dashboard.clone(),
        hub: services.hub.clone(),
    });

    let mut root = Router::new().route("/health", get(health).with_state(config.env));
    if config.env == AppEnv::Beta {
        root = root.route("/cron/wake", get(wake));
    }

    let mut router = root
        .nest("/api", api)
        .merge(ws_router(ws_state))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic));
    if config.is_development() {
        router = router.layer(axum::middleware::from_fn(expose_error_details));
    }

    router
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.frontend_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_panic_becomes_500() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
