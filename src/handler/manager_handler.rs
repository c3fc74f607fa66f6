use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::dto::manager_dto::UpdateManagerRequest;
use crate::service::manager_service::{ManagerService, ManagerServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;
use crate::util::validated_json::ValidatedJson;

pub async fn list_managers_handler(
    State(service): State<Arc<ManagerServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let managers = service.list_managers().await?;
    Ok(ApiResponse::ok(managers))
}

pub async fn update_manager_handler(
    State(service): State<Arc<ManagerServiceImpl>>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateManagerRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let manager = service.update_manager(&id, payload).await?;
    Ok(ApiResponse::with_message("Manager updated successfully", manager))
}

pub async fn delete_manager_handler(
    State(service): State<Arc<ManagerServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    service.delete_manager(&id).await?;
    Ok(ApiResponse::message("Manager deleted successfully"))
}

pub async fn toggle_status_handler(
    State(service): State<Arc<ManagerServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.toggle_status(&id).await?;
    let message = format!("Manager is now {}", res.status);
    Ok(ApiResponse::with_message(message, res))
}
