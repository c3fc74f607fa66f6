use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::TryStreamExt;
use std::io;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::warn;
use uuid::Uuid;

use crate::dto::camera_dto::{CameraListQuery, CreateCameraRequest, UpdateCameraRequest, VideoUpload};
use crate::service::camera_service::{CameraService, CameraServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;
use crate::util::validated_json::ValidatedJson;

const VIDEO_FIELD: &str = "video";

/// Declared content type, else guessed from the file name
fn upload_content_type(field: &Field<'_>, original_name: &str) -> String {
    field
        .content_type()
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(original_name).first().map(|m| m.essence_str().to_string()))
        .unwrap_or_default()
}

/// Keeps only characters that are safe in a temp file name
fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

async fn spool_field(field: Field<'_>, path: &FsPath) -> io::Result<i64> {
    let reader = StreamReader::new(field.map_err(io::Error::other));
    futures::pin_mut!(reader);
    let mut file = tokio::fs::File::create(path).await?;
    let bytes = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    Ok(bytes as i64)
}

async fn read_video(mut multipart: Multipart, upload_dir: &FsPath) -> Result<VideoUpload, HandlerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HandlerError::bad_request(e.body_text()))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("video").to_string();
        let content_type = upload_content_type(&field, &original_name);
        if !content_type.starts_with("video/") {
            return Err(HandlerError::bad_request("Only video files are allowed"));
        }

        tokio::fs::create_dir_all(upload_dir)
            .await
            .map_err(|e| HandlerError::internal(format!("Failed to create upload directory: {}", e)))?;
        let temp_path = upload_dir.join(format!("{}-{}", Uuid::new_v4(), safe_file_name(&original_name)));
        let bytes = match spool_field(field, &temp_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&temp_path).await {
                    warn!(path = %temp_path.display(), "Failed to remove partial upload: {}", rm);
                }
                return Err(HandlerError::bad_request(format!("Failed to read upload: {}", e)));
            }
        };

        return Ok(VideoUpload {
            original_name,
            content_type,
            temp_path,
            bytes,
        });
    }
    Err(HandlerError::bad_request("No video file uploaded"))
}

pub async fn add_camera_handler(
    State(service): State<Arc<CameraServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<CreateCameraRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let camera = service.add_camera(payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Camera added successfully", camera)))
}

pub async fn list_cameras_handler(
    State(service): State<Arc<CameraServiceImpl>>,
    Query(query): Query<CameraListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.list_cameras(query).await?;
    Ok(ApiResponse::ok(res))
}

pub async fn get_camera_handler(
    State(service): State<Arc<CameraServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.get_camera(&id).await?;
    Ok(ApiResponse::ok(res))
}

pub async fn update_camera_handler(
    State(service): State<Arc<CameraServiceImpl>>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateCameraRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let camera = service.update_camera(&id, payload).await?;
    Ok(ApiResponse::with_message("Camera updated successfully", camera))
}

pub async fn camera_health_handler(
    State(service): State<Arc<CameraServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let health = service.camera_health(&id).await?;
    Ok(ApiResponse::ok(health))
}

pub async fn restart_camera_handler(
    State(service): State<Arc<CameraServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let camera = service.restart_camera(&id).await?;
    Ok(ApiResponse::with_message("Camera restart initiated", camera))
}

// Multipart video upload, field `video`
pub async fn upload_video_handler(
    State(service): State<Arc<CameraServiceImpl>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let upload = read_video(multipart, &service.upload_dir).await?;
    let res = service.upload_video(&id, upload).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Video uploaded successfully", res)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("gate cam/../01.mp4"), "gate_cam_.._01.mp4");
        assert_eq!(safe_file_name(""), "upload");
    }
}
