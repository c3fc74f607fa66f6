use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handler::report_handler::{download_report_handler, generate_report_handler, list_reports_handler};
use crate::middlewares::{authorize, Action, Guard};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::report_service::ReportServiceImpl;

pub fn report_router(service: Arc<ReportServiceImpl>, auth: Arc<AuthServiceImpl>) -> Router {
    let view = Router::new()
        .route("/reports", get(list_reports_handler))
        .route("/reports/{id}/download", get(download_report_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth.clone(), Action::ViewReports),
            authorize,
        ));

    let generate = Router::new()
        .route("/reports/generate", post(generate_report_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth, Action::GenerateReports),
            authorize,
        ));

    view.merge(generate).with_state(service)
}
