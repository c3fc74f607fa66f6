use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::model::camera::{Coordinates, Zone};
use crate::model::incident::{BoundingBox, Evidence, Incident, IncidentStatus, IncidentType, Severity};
use crate::util::response::Pagination;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentRequest {
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    #[validate(length(min = 1, message = "Camera ID is required"))]
    pub camera_id: String,
    pub location: Option<IncidentLocationInput>,
    #[validate(length(min = 10, max = 500, message = "Description must be 10-500 characters"))]
    pub description: String,
    #[validate(nested)]
    pub ai_detection: AiDetectionInput,
    pub evidence: Option<Evidence>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentLocationInput {
    pub zone: Option<Zone>,
    pub specific: Option<String>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AiDetectionInput {
    #[validate(range(min = 0.0, max = 1.0, message = "Confidence must be between 0 and 1"))]
    pub confidence: f64,
    pub bounding_box: Option<BoundingBox>,
    pub model_version: Option<String>,
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: IncidentStatus,
    #[validate(length(max = 1000, message = "Action taken must not exceed 1000 characters"))]
    pub action_taken: Option<String>,
    #[validate(length(max = 1000, message = "Notes must not exceed 1000 characters"))]
    pub notes: Option<String>,
    /// When set, the update only applies if the stored version still matches
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[validate(length(min = 1, message = "Assignee is required"))]
    pub assignee_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListQuery {
    #[serde(rename = "type")]
    pub incident_type: Option<IncidentType>,
    pub severity: Option<Severity>,
    pub status: Option<IncidentStatus>,
    pub camera_id: Option<String>,
    pub zone: Option<Zone>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentListResponse {
    pub incidents: Vec<Incident>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Today,
    Week,
    Month,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentStatsQuery {
    pub period: Option<StatsPeriod>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStats {
    pub period: StatsPeriod,
    pub total_incidents: i64,
    pub by_type: BTreeMap<String, i64>,
    pub by_severity: BTreeMap<String, i64>,
    pub by_status: BTreeMap<String, i64>,
    /// Whole minutes between detection and resolution, averaged over resolved incidents
    pub average_response_time: i64,
    pub date_range: DateRange,
}
