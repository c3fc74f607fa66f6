use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::dto::incident_dto::{
    AssignRequest, CreateIncidentRequest, IncidentListQuery, IncidentStatsQuery, UpdateStatusRequest,
};
use crate::middlewares::CurrentUser;
use crate::service::incident_service::{IncidentService, IncidentServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;
use crate::util::validated_json::ValidatedJson;

pub async fn create_incident_handler(
    State(service): State<Arc<IncidentServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<CreateIncidentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let incident = service.create_incident(payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Incident created successfully", incident)))
}

pub async fn list_incidents_handler(
    State(service): State<Arc<IncidentServiceImpl>>,
    Query(query): Query<IncidentListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.list_incidents(query).await?;
    Ok(ApiResponse::ok(res))
}

pub async fn incident_stats_handler(
    State(service): State<Arc<IncidentServiceImpl>>,
    Query(query): Query<IncidentStatsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let stats = service.get_stats(query.period.unwrap_or_default()).await?;
    Ok(ApiResponse::ok(stats))
}

pub async fn get_incident_handler(
    State(service): State<Arc<IncidentServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let incident = service.get_incident(&id).await?;
    Ok(ApiResponse::ok(incident))
}

pub async fn update_status_handler(
    State(service): State<Arc<IncidentServiceImpl>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let incident = service.update_status(&id, payload, user.id).await?;
    Ok(ApiResponse::with_message("Incident status updated successfully", incident))
}

pub async fn assign_incident_handler(
    State(service): State<Arc<IncidentServiceImpl>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<AssignRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let incident = service.assign_incident(&id, &payload.assignee_id, user.id).await?;
    Ok(ApiResponse::with_message("Incident assigned successfully", incident))
}
