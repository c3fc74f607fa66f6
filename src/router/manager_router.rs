use axum::{
    middleware,
    routing::{get, patch, put},
    Router,
};
use std::sync::Arc;

use crate::handler::manager_handler::{
    delete_manager_handler, list_managers_handler, toggle_status_handler, update_manager_handler,
};
use crate::middlewares::{authorize, Action, Guard};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::manager_service::ManagerServiceImpl;

pub fn manager_router(service: Arc<ManagerServiceImpl>, auth: Arc<AuthServiceImpl>) -> Router {
    Router::new()
        .route("/admin/managers", get(list_managers_handler))
        .route("/admin/managers/{id}", put(update_manager_handler).delete(delete_manager_handler))
        .route("/admin/managers/{id}/toggle-status", patch(toggle_status_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth, Action::ManageManagers),
            authorize,
        ))
        .with_state(service)
}
