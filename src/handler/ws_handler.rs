use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::user::User;
use crate::realtime::events::ConnectedData;
use crate::realtime::hub::camera_room;
use crate::realtime::{ClientMessage, RealtimeHub};
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::service::dashboard_service::{DashboardService, DashboardServiceImpl};
use crate::util::error::HandlerError;
use crate::util::jwt::JwtTokenUtils;

pub struct WsState {
    pub auth: Arc<AuthServiceImpl>,
    pub dashboard: Arc<DashboardServiceImpl>,
    pub hub: Arc<RealtimeHub>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

fn bearer_token(state: &WsState, query: WsQuery, headers: &HeaderMap) -> Option<String> {
    query.token.filter(|t| !t.is_empty()).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| state.auth.jwt_utils.extract_token_from_header(h).ok())
    })
}

// The token is checked before the upgrade so unauthenticated clients get a 401
pub async fn ws_handler(
    State(state): State<Arc<WsState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, HandlerError> {
    let token = bearer_token(&state, query, &headers)
        .ok_or_else(|| HandlerError::unauthorized("Authentication required"))?;
    let user = state.auth.authenticate(&token).await?;
    match ws {
        Ok(ws) => Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user))),
        Err(rejection) => {
            debug!(user_id = %user.id_hex(), "WebSocket upgrade rejected: {}", rejection);
            Ok(rejection.into_response())
        }
    }
}

/// Register the user with the hub and queue the `connected` frame
pub async fn open_session(hub: &RealtimeHub, user: &User) -> (Uuid, UnboundedReceiver<String>) {
    let user_id = user.id_hex();
    let (conn_id, rx) = hub.register(&user_id, user.role).await;
    hub.emit_to_connection(
        &conn_id,
        "connected",
        &ConnectedData {
            message: "Connected to Swachhta Prahari real-time service".to_string(),
            user_id,
            role: user.role.to_string(),
        },
    )
    .await;
    (conn_id, rx)
}

async fn handle_socket(socket: WebSocket, state: Arc<WsState>, user: User) {
    let (conn_id, mut rx) = open_session(&state.hub, &user).await;

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    handle_client_message(&recv_state.hub, recv_state.dashboard.as_ref(), &conn_id, text.as_str()).await
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    state.hub.unregister(&conn_id).await;
}

pub async fn handle_client_message(hub: &RealtimeHub, dashboard: &dyn DashboardService, conn_id: &Uuid, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(connection_id = %conn_id, "Ignoring client message: {}", e);
            return;
        }
    };

    match message {
        ClientMessage::SubscribeToCamera(camera_id) => hub.join(conn_id, camera_room(&camera_id)).await,
        ClientMessage::UnsubscribeFromCamera(camera_id) => hub.leave(conn_id, &camera_room(&camera_id)).await,
        ClientMessage::RequestLiveData => match dashboard.live_data().await {
            Ok(data) => hub.emit_to_connection(conn_id, "live_data", &data).await,
            Err(e) => warn!(connection_id = %conn_id, "Failed to collect live data: {}", e),
        },
    }
}
