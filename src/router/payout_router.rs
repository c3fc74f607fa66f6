use axum::{
    middleware,
    routing::{delete, get, put},
    Router,
};
use std::sync::Arc;

use crate::handler::payout_handler::{delete_payout_handler, list_payouts_handler, update_payout_handler};
use crate::middlewares::{authorize, Action, Guard};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::payout_service::PayoutServiceImpl;

pub fn payout_router(service: Arc<PayoutServiceImpl>, auth: Arc<AuthServiceImpl>) -> Router {
    let manage = Router::new()
        .route("/payouts", get(list_payouts_handler))
        .route("/payouts/{id}", put(update_payout_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth.clone(), Action::ManagePayouts),
            authorize,
        ));

    let remove = Router::new()
        .route("/payouts/{id}", delete(delete_payout_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth, Action::DeletePayouts),
            authorize,
        ));

    manage.merge(remove).with_state(service)
}
