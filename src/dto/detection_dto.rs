use serde::{Deserialize, Serialize};

use crate::model::camera::{Coordinates, Zone};
use crate::model::incident::{BoundingBox, Evidence, IncidentType, Severity};

/// Raw webhook body. Every field is optional so that missing ones are reported
/// individually instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionPayload {
    pub camera_id: Option<String>,
    pub detection: Option<DetectionData>,
    pub timestamp: Option<String>,
    pub location: Option<DetectionLocation>,
    pub evidence: Option<Evidence>,
    /// Repeated deliveries carrying the same key create one incident
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionData {
    #[serde(rename = "type")]
    pub detection_type: Option<String>,
    pub confidence: Option<f64>,
    pub bounding_box: Option<BoundingBox>,
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionLocation {
    pub zone: Option<Zone>,
    pub specific: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// A payload that passed shape validation
#[derive(Debug, Clone)]
pub struct ValidDetection {
    pub camera_id: String,
    pub incident_type: IncidentType,
    pub confidence: f64,
    pub bounding_box: Option<BoundingBox>,
    pub model_version: Option<String>,
    pub timestamp: String,
    pub location: Option<DetectionLocation>,
    pub evidence: Option<Evidence>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResponse {
    pub processed: bool,
    pub incident_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub confidence: f64,
    pub threshold: f64,
    pub duplicate: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStatsQuery {
    pub time_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeDetections {
    #[serde(rename = "type")]
    pub detection_type: IncidentType,
    pub count: i64,
    pub avg_confidence: Option<f64>,
    pub false_positives: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyDetections {
    pub date: String,
    pub detections: Vec<TypeDetections>,
    pub total_detections: i64,
    pub total_false_positives: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub total_detections: i64,
    pub total_false_positives: i64,
    /// Percentage of detections not marked false positive
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStatsResponse {
    pub time_range: String,
    pub detection_stats: Vec<DailyDetections>,
    pub summary: DetectionSummary,
}
