use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::dto::camera_dto::AiConfigUpdateRequest;
use crate::dto::detection_dto::{DetectionPayload, DetectionStatsQuery};
use crate::service::detection_service::{DetectionService, DetectionServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;
use crate::util::validated_json::ValidatedJson;

// Detection webhook. Field checks happen in the service so every problem is reported at once.
pub async fn detection_webhook_handler(
    State(service): State<Arc<DetectionServiceImpl>>,
    payload: Result<Json<DetectionPayload>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload.map_err(|rejection| HandlerError::bad_request(rejection.body_text()))?;
    let res = service.process_detection(payload).await?;
    let message = if res.duplicate {
        "Detection already processed"
    } else if res.incident_created {
        "Detection processed and incident created"
    } else {
        "Detection processed, below confidence threshold"
    };
    Ok(ApiResponse::with_message(message, res))
}

pub async fn detection_stats_handler(
    State(service): State<Arc<DetectionServiceImpl>>,
    Query(query): Query<DetectionStatsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let stats = service.get_detection_stats(query.time_range).await?;
    Ok(ApiResponse::ok(stats))
}

pub async fn update_ai_config_handler(
    State(service): State<Arc<DetectionServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<AiConfigUpdateRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.update_ai_config(payload).await?;
    Ok(ApiResponse::with_message("AI configuration updated successfully", res))
}
