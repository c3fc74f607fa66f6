use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::camera::{CameraLocation, CameraStatus};
use crate::model::incident::Incident;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub ai_processing_engine: String,
    pub database_connection: String,
    /// `{online}/{total}`
    pub camera_network: String,
    pub connected_clients: usize,
    pub last_update: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Today's incidents keyed by status
    pub incident_summary: BTreeMap<String, i64>,
    /// Cameras keyed by status
    pub camera_status: BTreeMap<String, i64>,
    pub critical_incidents: Vec<Incident>,
    pub system_health: SystemHealth,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPerformanceQuery {
    pub time_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraPerformance {
    pub camera_id: String,
    pub name: String,
    pub location: CameraLocation,
    pub status: CameraStatus,
    pub uptime: f64,
    /// Incidents raised by this camera inside the range
    pub detection_count: i64,
    /// Share of those incidents not marked false positive, in percent
    pub accuracy: f64,
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraPerformanceSummary {
    pub total_cameras: usize,
    pub average_accuracy: f64,
    pub total_detections: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPerformanceResponse {
    pub time_range: String,
    pub cameras: Vec<CameraPerformance>,
    pub summary: CameraPerformanceSummary,
}
