use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::ai_handler::{detection_stats_handler, detection_webhook_handler, update_ai_config_handler};
use crate::middlewares::{authorize, rate_limit, Action, Guard, RateLimiter};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::detection_service::DetectionServiceImpl;

/// The webhook is unauthenticated and carries its own rate limit; the other routes
/// share the API limit.
pub fn ai_router(
    service: Arc<DetectionServiceImpl>,
    auth: Arc<AuthServiceImpl>,
    webhook_limiter: RateLimiter,
    api_limiter: RateLimiter,
) -> Router {
    let webhook = Router::new()
        .route("/ai/detection", post(detection_webhook_handler))
        .route_layer(middleware::from_fn_with_state(webhook_limiter, rate_limit));

    let stats = Router::new()
        .route("/ai/detection/stats", get(detection_stats_handler))
        .route_layer(middleware::from_fn_with_state(Guard::authenticated(auth.clone()), authorize));

    let config = Router::new()
        .route("/ai/config", put(update_ai_config_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth, Action::ConfigureAi),
            authorize,
        ));

    let protected = stats
        .merge(config)
        .route_layer(middleware::from_fn_with_state(api_limiter, rate_limit));

    webhook.merge(protected).with_state(service)
}
