use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::model::camera::{
    AiConfig, Camera, CameraLocation, CameraStatus, Maintenance, Sensitivity, Specifications, UploadedVideo, Zone,
};
use crate::model::incident::{Incident, IncidentType};
use crate::util::response::Pagination;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCameraRequest {
    #[validate(length(min = 1, max = 50, message = "Camera ID is required"))]
    pub camera_id: String,
    #[validate(length(min = 1, max = 100, message = "Camera name must be 1-100 characters"))]
    pub name: String,
    pub location: CameraLocation,
    #[validate(length(min = 1, message = "RTSP URL is required"))]
    pub rtsp_url: String,
    pub status: Option<CameraStatus>,
    pub specifications: Option<Specifications>,
    #[validate(nested)]
    pub ai_config: Option<AiConfigPatch>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCameraRequest {
    #[validate(length(min = 1, max = 100, message = "Camera name must be 1-100 characters"))]
    pub name: Option<String>,
    pub location: Option<CameraLocation>,
    #[validate(length(min = 1, message = "RTSP URL cannot be empty"))]
    pub rtsp_url: Option<String>,
    pub status: Option<CameraStatus>,
    pub specifications: Option<Specifications>,
    pub maintenance: Option<Maintenance>,
    #[validate(nested)]
    pub ai_config: Option<AiConfigPatch>,
}

/// Partial AI configuration; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigPatch {
    pub enabled: Option<bool>,
    #[validate(length(min = 1, message = "At least one detection type is required"))]
    pub detection_types: Option<Vec<IncidentType>>,
    pub sensitivity: Option<Sensitivity>,
    #[validate(range(min = 0.5, max = 0.99, message = "Confidence threshold must be between 0.5 and 0.99"))]
    pub confidence_threshold: Option<f64>,
}

impl AiConfigPatch {
    pub fn apply(&self, config: &mut AiConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(types) = &self.detection_types {
            config.detection_types = types.clone();
        }
        if let Some(sensitivity) = self.sensitivity {
            config.sensitivity = sensitivity;
        }
        if let Some(threshold) = self.confidence_threshold {
            config.confidence_threshold = threshold;
        }
    }
}

/// `PUT /api/ai/config`: one camera when `cameraId` is set, otherwise all of them
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigUpdateRequest {
    pub camera_id: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub config: AiConfigPatch,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigUpdateResponse {
    pub modified_count: u64,
    pub configuration: AiConfigPatch,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraListQuery {
    pub zone: Option<Zone>,
    pub status: Option<CameraStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraListResponse {
    pub cameras: Vec<Camera>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDetailResponse {
    pub camera: Camera,
    pub recent_incidents: Vec<Incident>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraHealth {
    pub camera_id: String,
    pub status: CameraStatus,
    pub last_detection: Option<String>,
    pub total_detections: i64,
    pub uptime: f64,
    pub maintenance: Maintenance,
    pub checked_at: String,
}

/// A video received from a multipart upload and spooled to a temp file
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub original_name: String,
    pub content_type: String,
    pub temp_path: PathBuf,
    pub bytes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUploadResponse {
    pub camera_id: String,
    pub video: UploadedVideo,
}
