use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::incident::IncidentType;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;
pub const MIN_CONFIDENCE_THRESHOLD: f64 = 0.5;
pub const MAX_CONFIDENCE_THRESHOLD: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    A,
    B,
    C,
    D,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::A => "A",
            Zone::B => "B",
            Zone::C => "C",
            Zone::D => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Online,
    #[default]
    Offline,
    Maintenance,
}

impl CameraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraStatus::Online => "online",
            CameraStatus::Offline => "offline",
            CameraStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraLocation {
    pub zone: Zone,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Specifications {
    pub resolution: Option<String>,
    pub fps: Option<u32>,
    pub night_vision: bool,
    pub weather_proof: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_detection_types() -> Vec<IncidentType> {
    IncidentType::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_detection_types")]
    pub detection_types: Vec<IncidentType>,
    #[serde(default)]
    pub sensitivity: Sensitivity,
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            enabled: true,
            detection_types: default_detection_types(),
            sensitivity: Sensitivity::Medium,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub url: String,
    pub object_key: String,
    pub original_name: String,
    pub format: String,
    pub bytes: i64,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraStatistics {
    pub total_detections: i64,
    pub last_detection: Option<String>,
    pub uptime: f64,
    pub average_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Maintenance {
    pub last_maintenance: Option<String>,
    pub next_maintenance: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub camera_id: String,
    pub name: String,
    pub location: CameraLocation,
    pub rtsp_url: String,
    #[serde(default)]
    pub status: CameraStatus,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default)]
    pub ai_config: AiConfig,
    #[serde(default)]
    pub uploaded_videos: Vec<UploadedVideo>,
    #[serde(default)]
    pub statistics: CameraStatistics,
    #[serde(default)]
    pub maintenance: Maintenance,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Camera {
    pub fn new(camera_id: &str, name: &str, location: CameraLocation, rtsp_url: &str) -> Self {
        Camera {
            id: None,
            camera_id: normalize_camera_id(camera_id),
            name: name.trim().to_string(),
            location,
            rtsp_url: rtsp_url.trim().to_string(),
            status: CameraStatus::Offline,
            specifications: Specifications::default(),
            ai_config: AiConfig::default(),
            uploaded_videos: Vec::new(),
            statistics: CameraStatistics::default(),
            maintenance: Maintenance::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Confidence a detection needs before it becomes an incident
    pub fn confidence_threshold(&self) -> f64 {
        let threshold = self.ai_config.confidence_threshold;
        if threshold.is_finite() && threshold > 0.0 {
            threshold
        } else {
            DEFAULT_CONFIDENCE_THRESHOLD
        }
    }
}

/// Camera identifiers are stored upper-cased
pub fn normalize_camera_id(camera_id: &str) -> String {
    camera_id.trim().to_uppercase()
}

/// Minimal camera view embedded in incident payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSummary {
    pub id: String,
    pub camera_id: String,
    pub name: String,
    pub location: CameraLocation,
}

impl From<&Camera> for CameraSummary {
    fn from(camera: &Camera) -> Self {
        CameraSummary {
            id: camera.id.map(|id| id.to_hex()).unwrap_or_default(),
            camera_id: camera.camera_id.clone(),
            name: camera.name.clone(),
            location: camera.location.clone(),
        }
    }
}
