use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::incident::{IncidentStatus, IncidentType, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Daily,
    Weekly,
    Monthly,
    Custom,
    IncidentSummary,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Daily => "daily",
            ReportType::Weekly => "weekly",
            ReportType::Monthly => "monthly",
            ReportType::Custom => "custom",
            ReportType::IncidentSummary => "incident_summary",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Excel,
    Csv,
    #[default]
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "xlsx",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start_date: String,
    pub end_date: String,
}

/// Incident line embedded in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIncident {
    pub incident_id: String,
    pub timestamp: String,
    pub camera_id: String,
    pub event_type: IncidentType,
    pub location_details: Option<String>,
    pub severity: Severity,
    pub status: IncidentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportAnalytics {
    pub total_incidents: i64,
    pub by_type: BTreeMap<String, i64>,
    pub by_severity: BTreeMap<String, i64>,
    pub by_status: BTreeMap<String, i64>,
    pub resolved: i64,
    pub false_positives: i64,
    pub average_response_minutes: Option<f64>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub filename: String,
    pub path: String,
    pub format: ReportFormat,
    pub size: i64,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryStatus {
    pub email_sent: bool,
    pub sent_at: Option<String>,
    pub recipients: Vec<String>,
    pub delivery_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub report_id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub period: ReportPeriod,
    #[serde(default)]
    pub incidents: Vec<ReportIncident>,
    #[serde(default)]
    pub analytics: ReportAnalytics,
    pub file_info: Option<FileInfo>,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    pub generated_by: Option<ObjectId>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// `RPT-{YYYYMMDD}-{sequence}`
pub fn format_report_id(generated_at: &DateTime<Utc>, sequence: i64) -> String {
    format!("RPT-{}-{:04}", generated_at.format("%Y%m%d"), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_id_format() {
        let at = Utc.with_ymd_and_hms(2025, 9, 7, 18, 30, 0).unwrap();
        assert_eq!(format_report_id(&at, 42), "RPT-20250907-0042");
    }

    #[test]
    fn test_report_type_wire_names() {
        assert_eq!(serde_json::to_value(ReportType::IncidentSummary).unwrap(), "incident_summary");
        let parsed: ReportFormat = serde_json::from_value(serde_json::json!("csv")).unwrap();
        assert_eq!(parsed, ReportFormat::Csv);
    }
}
