use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handler::ws_handler::{ws_handler, WsState};

pub fn ws_router(state: Arc<WsState>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}
