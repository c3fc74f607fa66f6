use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handler::auth_handler::{
    get_otp_handler, login_handler, logout_handler, me_handler, refresh_token_handler, signup_handler,
    update_password_handler, verify_otp_handler,
};
use crate::middlewares::{authorize, Guard};
use crate::service::auth_service::AuthServiceImpl;

pub fn auth_router(service: Arc<AuthServiceImpl>) -> Router {
    let public = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/signup", post(signup_handler))
        .route("/auth/get-otp", post(get_otp_handler))
        .route("/auth/verify-otp", post(verify_otp_handler))
        .route("/auth/update-password", post(update_password_handler))
        .route("/auth/refresh-token", post(refresh_token_handler));

    let authenticated = Router::new()
        .route("/auth/logout", post(logout_handler))
        .route("/auth/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(Guard::authenticated(service.clone()), authorize));

    public.merge(authenticated).with_state(service)
}
