use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::dto::dashboard_dto::CameraPerformanceQuery;
use crate::service::dashboard_service::{DashboardService, DashboardServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;

pub async fn dashboard_handler(
    State(service): State<Arc<DashboardServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let dashboard = service.dashboard().await?;
    Ok(ApiResponse::ok(dashboard))
}

pub async fn camera_performance_handler(
    State(service): State<Arc<DashboardServiceImpl>>,
    Query(query): Query<CameraPerformanceQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let performance = service.camera_performance(query.time_range).await?;
    Ok(ApiResponse::ok(performance))
}
