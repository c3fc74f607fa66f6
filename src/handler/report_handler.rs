use axum::{
    extract::{Extension, Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
};
use std::sync::Arc;

use crate::dto::report_dto::{GenerateReportRequest, ReportListQuery};
use crate::middlewares::CurrentUser;
use crate::service::report_service::{ReportService, ReportServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;
use crate::util::validated_json::ValidatedJson;

pub async fn generate_report_handler(
    State(service): State<Arc<ReportServiceImpl>>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<GenerateReportRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let report = service.generate_report(payload, Some(user.id)).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Report generated", report)))
}

pub async fn list_reports_handler(
    State(service): State<Arc<ReportServiceImpl>>,
    Query(query): Query<ReportListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.list_reports(query).await?;
    Ok(ApiResponse::ok(res))
}

pub async fn download_report_handler(
    State(service): State<Arc<ReportServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let file = service.download_report(&id).await?;
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [(CONTENT_TYPE, file.content_type.to_string()), (CONTENT_DISPOSITION, disposition)],
        file.bytes,
    ))
}
