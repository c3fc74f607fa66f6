use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::dto::camera_dto::{
    CameraDetailResponse, CameraHealth, CameraListQuery, CameraListResponse, CreateCameraRequest,
    UpdateCameraRequest, VideoUpload, VideoUploadResponse,
};
use crate::model::camera::{Camera, CameraStatus, UploadedVideo};
use crate::realtime::RealtimeHub;
use crate::repository::camera_repo::{CameraFilter, CameraRepository};
use crate::repository::incident_repo::{IncidentFilter, IncidentPage, IncidentRepository, IncidentSortField};
use crate::util::error::ServiceError;
use crate::util::minio::{video_object_key, ObjectStore};
use crate::util::response::{normalize_paging, page_skip, Pagination};
use crate::util::time;

const RECENT_INCIDENTS: i64 = 10;

/// Accepts either the document id or the camera identifier
pub async fn find_camera(repo: &dyn CameraRepository, id: &str) -> Result<Camera, ServiceError> {
    let found = match ObjectId::parse_str(id) {
        Ok(oid) => repo.find_by_id(&oid).await?,
        Err(_) => None,
    };
    let found = match found {
        Some(camera) => Some(camera),
        None => repo.find_by_camera_id(id).await?,
    };
    found.ok_or_else(|| ServiceError::NotFound("Camera not found".to_string()))
}

/// File extension of the upload, falling back to the MIME subtype
pub fn video_format(original_name: &str, content_type: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .or_else(|| content_type.split('/').nth(1).map(str::to_string))
        .unwrap_or_else(|| "bin".to_string())
}

async fn remove_temp_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), "Failed to remove temp upload: {}", e);
    }
}

#[async_trait]
pub trait CameraService: Send + Sync {
    async fn add_camera(&self, request: CreateCameraRequest) -> Result<Camera, ServiceError>;
    async fn list_cameras(&self, query: CameraListQuery) -> Result<CameraListResponse, ServiceError>;
    async fn get_camera(&self, id: &str) -> Result<CameraDetailResponse, ServiceError>;
    async fn update_camera(&self, id: &str, request: UpdateCameraRequest) -> Result<Camera, ServiceError>;
    async fn camera_health(&self, id: &str) -> Result<CameraHealth, ServiceError>;
    async fn restart_camera(&self, id: &str) -> Result<Camera, ServiceError>;
    async fn upload_video(&self, camera_id: &str, upload: VideoUpload) -> Result<VideoUploadResponse, ServiceError>;
}

pub struct CameraServiceImpl {
    pub camera_repo: Arc<dyn CameraRepository>,
    pub incident_repo: Arc<dyn IncidentRepository>,
    pub object_store: Arc<dyn ObjectStore>,
    pub hub: Arc<RealtimeHub>,
    /// Multipart uploads are spooled here before they reach the object store
    pub upload_dir: PathBuf,
}

impl CameraServiceImpl {
    pub fn new(
        camera_repo: Arc<dyn CameraRepository>,
        incident_repo: Arc<dyn IncidentRepository>,
        object_store: Arc<dyn ObjectStore>,
        hub: Arc<RealtimeHub>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            camera_repo,
            incident_repo,
            object_store,
            hub,
            upload_dir: upload_dir.into(),
        }
    }

    async fn store_video(&self, camera: &Camera, upload: &VideoUpload) -> Result<UploadedVideo, ServiceError> {
        let camera_oid = camera
            .id
            .ok_or_else(|| ServiceError::InternalError("Camera has no id".to_string()))?;
        let data = tokio::fs::read(&upload.temp_path)
            .await
            .map_err(|e| ServiceError::InternalError(format!("Failed to read upload: {}", e)))?;

        let object_key = video_object_key(&camera.camera_id, Utc::now().timestamp_millis(), &upload.original_name);
        let url = self
            .object_store
            .put_object(&object_key, data, Some(&upload.content_type))
            .await
            .map_err(|e| {
                error!(object_key = %object_key, "Video upload failed: {}", e);
                ServiceError::Upstream("Failed to upload video".to_string())
            })?;

        let video = UploadedVideo {
            url,
            object_key,
            original_name: upload.original_name.clone(),
            format: video_format(&upload.original_name, &upload.content_type),
            bytes: upload.bytes,
            uploaded_at: time::now(),
        };
        // the object stays in the bucket if this write fails
        if let Err(e) = self.camera_repo.push_video(&camera_oid, video.clone()).await {
            error!(object_key = %video.object_key, "Uploaded video not recorded on camera: {}", e);
            return Err(e.into());
        }
        Ok(video)
    }
}

#[async_trait]
impl CameraService for CameraServiceImpl {
    #[instrument(skip(self, request), fields(camera_id = %request.camera_id))]
    async fn add_camera(&self, request: CreateCameraRequest) -> Result<Camera, ServiceError> {
        if self.camera_repo.find_by_camera_id(&request.camera_id).await?.is_some() {
            return Err(ServiceError::InvalidInput("Camera with this ID already exists".to_string()));
        }

        let mut camera = Camera::new(&request.camera_id, &request.name, request.location, &request.rtsp_url);
        if let Some(status) = request.status {
            camera.status = status;
        }
        if let Some(specifications) = request.specifications {
            camera.specifications = specifications;
        }
        if let Some(patch) = &request.ai_config {
            patch.apply(&mut camera.ai_config);
        }

        let camera = self.camera_repo.insert(camera).await.map_err(|e| match ServiceError::from(e) {
            ServiceError::Conflict(_) => ServiceError::InvalidInput("Camera with this ID already exists".to_string()),
            other => other,
        })?;
        info!("Camera added");
        Ok(camera)
    }

    async fn list_cameras(&self, query: CameraListQuery) -> Result<CameraListResponse, ServiceError> {
        let (page, limit) = normalize_paging(query.page, query.limit, 50, 100);
        let filter = CameraFilter {
            zone: query.zone,
            status: query.status,
        };
        let cameras = self.camera_repo.list(&filter, page_skip(page, limit), limit as i64).await?;
        let total = self.camera_repo.count(&filter).await?;
        Ok(CameraListResponse {
            cameras,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn get_camera(&self, id: &str) -> Result<CameraDetailResponse, ServiceError> {
        let camera = find_camera(self.camera_repo.as_ref(), id).await?;
        let filter = IncidentFilter {
            camera: camera.id,
            ..Default::default()
        };
        let recent_incidents = self
            .incident_repo
            .list(
                &filter,
                IncidentPage {
                    skip: 0,
                    limit: RECENT_INCIDENTS,
                    sort_by: IncidentSortField::CreatedAt,
                    descending: true,
                },
            )
            .await?;
        Ok(CameraDetailResponse {
            camera,
            recent_incidents,
        })
    }

    #[instrument(skip(self, request))]
    async fn update_camera(&self, id: &str, request: UpdateCameraRequest) -> Result<Camera, ServiceError> {
        let mut camera = find_camera(self.camera_repo.as_ref(), id).await?;
        let previous_status = camera.status;

        if let Some(name) = request.name {
            camera.name = name.trim().to_string();
        }
        if let Some(location) = request.location {
            camera.location = location;
        }
        if let Some(rtsp_url) = request.rtsp_url {
            camera.rtsp_url = rtsp_url.trim().to_string();
        }
        if let Some(status) = request.status {
            camera.status = status;
        }
        if let Some(specifications) = request.specifications {
            camera.specifications = specifications;
        }
        if let Some(maintenance) = request.maintenance {
            camera.maintenance = maintenance;
        }
        if let Some(patch) = &request.ai_config {
            patch.apply(&mut camera.ai_config);
        }

        let camera = self.camera_repo.update(camera).await?;
        if camera.status != previous_status {
            self.hub
                .broadcast_camera_status(&camera.camera_id, camera.status, Some("updated".to_string()))
                .await;
        }
        info!(camera_id = %camera.camera_id, "Camera updated");
        Ok(camera)
    }

    async fn camera_health(&self, id: &str) -> Result<CameraHealth, ServiceError> {
        let camera = find_camera(self.camera_repo.as_ref(), id).await?;
        Ok(CameraHealth {
            camera_id: camera.camera_id,
            status: camera.status,
            last_detection: camera.statistics.last_detection,
            total_detections: camera.statistics.total_detections,
            uptime: camera.statistics.uptime,
            maintenance: camera.maintenance,
            checked_at: time::now(),
        })
    }

    #[instrument(skip(self))]
    async fn restart_camera(&self, id: &str) -> Result<Camera, ServiceError> {
        let mut camera = find_camera(self.camera_repo.as_ref(), id).await?;
        camera.status = CameraStatus::Online;
        camera.maintenance.last_maintenance = Some(time::now());

        let camera = self.camera_repo.update(camera).await?;
        self.hub
            .broadcast_camera_status(&camera.camera_id, CameraStatus::Online, Some("restart".to_string()))
            .await;
        info!(camera_id = %camera.camera_id, "Camera restarted");
        Ok(camera)
    }

    #[instrument(skip(self, upload), fields(original_name = %upload.original_name, bytes = upload.bytes))]
    async fn upload_video(&self, camera_id: &str, upload: VideoUpload) -> Result<VideoUploadResponse, ServiceError> {
        let result = match self.camera_repo.find_by_camera_id(camera_id).await {
            Ok(Some(camera)) => self.store_video(&camera, &upload).await.map(|video| VideoUploadResponse {
                camera_id: camera.camera_id.clone(),
                video,
            }),
            Ok(None) => Err(ServiceError::NotFound("Camera not found".to_string())),
            Err(e) => Err(e.into()),
        };
        remove_temp_file(&upload.temp_path).await;
        if result.is_ok() {
            info!("Video uploaded");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_format() {
        assert_eq!(video_format("gate.MP4", "video/mp4"), "mp4");
        assert_eq!(video_format("clip", "video/webm"), "webm");
        assert_eq!(video_format("clip", ""), "bin");
    }
}
