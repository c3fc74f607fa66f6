use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// S3-compatible object store holding uploaded camera videos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    /// Public prefix prepended to object keys to build download links
    pub links_prefix: String,
    pub secure: bool,
}

impl MinioConfig {
    /// Expected environment variables:
    /// - MINIO_ENDPOINT (e.g. "localhost:9000")
    /// - MINIO_ACCESS_KEY / MINIO_SECRET_KEY
    /// - MINIO_BUCKET_NAME (defaults to camera-videos)
    /// - MINIO_LINKS_PREFIX (defaults to http://{endpoint}/{bucket}/)
    /// - MINIO_SECURE (defaults to false)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading MinIO configuration from environment variables");

        let endpoint = env::var("MINIO_ENDPOINT").map_err(|_| {
            error!("MINIO_ENDPOINT environment variable not found");
            ConfigError::EnvVarNotFound("MINIO_ENDPOINT".to_string())
        })?;
        let access_key = env::var("MINIO_ACCESS_KEY").map_err(|_| {
            error!("MINIO_ACCESS_KEY environment variable not found");
            ConfigError::EnvVarNotFound("MINIO_ACCESS_KEY".to_string())
        })?;
        let secret_key = env::var("MINIO_SECRET_KEY").map_err(|_| {
            error!("MINIO_SECRET_KEY environment variable not found");
            ConfigError::EnvVarNotFound("MINIO_SECRET_KEY".to_string())
        })?;
        debug!("MinIO credentials loaded");

        let bucket_name = env::var("MINIO_BUCKET_NAME").unwrap_or_else(|_| {
            warn!("MINIO_BUCKET_NAME not set, using default: camera-videos");
            "camera-videos".to_string()
        });

        let secure = env::var("MINIO_SECURE")
            .map(|v| v.parse().unwrap_or(false))
            .unwrap_or(false);

        let links_prefix = env::var("MINIO_LINKS_PREFIX").unwrap_or_else(|_| {
            let protocol = if secure { "https" } else { "http" };
            format!("{}://{}/{}/", protocol, endpoint, bucket_name)
        });
        debug!("MinIO links prefix: {}", links_prefix);

        let config = Self {
            endpoint,
            access_key,
            secret_key,
            bucket_name,
            links_prefix,
            secure,
        };
        config.validate()?;
        info!("MinIO configuration loaded successfully");
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::ValidationError("Endpoint cannot be empty".to_string()));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(ConfigError::ValidationError("Access and secret keys cannot be empty".to_string()));
        }
        if !self.bucket_name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.') {
            error!("Invalid bucket name format: {}", self.bucket_name);
            return Err(ConfigError::ValidationError("Bucket name contains invalid characters".to_string()));
        }
        if self.bucket_name.len() < 3 || self.bucket_name.len() > 63 {
            return Err(ConfigError::ValidationError(
                "Bucket name must be between 3 and 63 characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the full endpoint URL with protocol
    pub fn get_endpoint_url(&self) -> String {
        let protocol = if self.secure { "https" } else { "http" };
        format!("{}://{}", protocol, self.endpoint)
    }

    /// Public link for an object key
    pub fn object_url(&self, object_name: &str) -> String {
        format!("{}/{}", self.links_prefix.trim_end_matches('/'), object_name)
    }
}

impl Default for MinioConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket_name: "camera-videos".to_string(),
            links_prefix: "http://localhost:9000/camera-videos/".to_string(),
            secure: false,
        }
    }
}
