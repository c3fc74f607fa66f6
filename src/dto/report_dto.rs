use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::model::report::{Report, ReportFormat, ReportType};
use crate::util::response::Pagination;

fn validate_recipients(recipients: &Vec<String>) -> Result<(), ValidationError> {
    let valid = recipients.iter().all(|r| {
        let parts: Vec<&str> = r.split('@').collect();
        parts.len() == 2 && !parts[0].is_empty() && parts[1].contains('.')
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Invalid email address in recipients".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub format: ReportFormat,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[validate(custom(function = "validate_recipients"))]
    pub email_recipients: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListQuery {
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<Report>,
    pub pagination: Pagination,
}
