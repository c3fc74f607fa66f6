use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::ConfigError;

/// Deployment environment, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Beta,
    Production,
}

impl AppEnv {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "beta" => Ok(AppEnv::Beta),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(ConfigError::InvalidValue(format!("Unknown APP_ENV: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Beta => "beta",
            AppEnv::Production => "production",
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: AppEnv,
    /// Origin allowed by CORS
    pub frontend_url: String,
    /// Public base URL of this server, pinged by the keep-alive job
    pub server_url: Option<String>,
    /// Scratch directory for multipart uploads before they reach the object store
    pub upload_dir: String,
    /// Directory where generated report files are written
    pub reports_dir: String,
    pub max_upload_mb: usize,
}

impl AppConfig {
    /// Expected environment variables:
    /// - APP_HOST (defaults to 127.0.0.1)
    /// - APP_PORT (defaults to 5000)
    /// - APP_ENV: development | beta | production (defaults to development)
    /// - FRONTEND_URL (defaults to http://localhost:3000)
    /// - SERVER_URL (optional)
    /// - UPLOAD_DIR (defaults to uploads/tmp)
    /// - REPORTS_DIR (defaults to reports)
    /// - MAX_UPLOAD_MB (defaults to 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading application configuration from environment variables");

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| {
                warn!("APP_PORT not set, using default: 5000");
                "5000".to_string()
            })
            .parse::<u16>()
            .map_err(|e| ConfigError::ParseError(format!("Invalid APP_PORT: {}", e)))?;

        let env_name = env::var("APP_ENV").unwrap_or_else(|_| {
            warn!("APP_ENV not set, using default: development");
            "development".to_string()
        });
        let app_env = AppEnv::parse(&env_name)?;
        debug!("Application environment: {}", app_env);

        let frontend_url = env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        debug!("Frontend URL: {}", frontend_url);

        let server_url = env::var("SERVER_URL").ok();
        if server_url.is_none() {
            debug!("No SERVER_URL provided, keep-alive job will stay idle");
        }

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads/tmp".to_string());
        let reports_dir = env::var("REPORTS_DIR").unwrap_or_else(|_| "reports".to_string());
        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<usize>()
            .map_err(|e| ConfigError::ParseError(format!("Invalid MAX_UPLOAD_MB: {}", e)))?;

        let config = AppConfig {
            host,
            port,
            env: app_env,
            frontend_url,
            server_url,
            upload_dir,
            reports_dir,
            max_upload_mb,
        };
        config.validate()?;
        info!("Application configuration loaded successfully");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::ValidationError("APP_HOST cannot be empty".to_string()));
        }
        if self.max_upload_mb == 0 {
            return Err(ConfigError::ValidationError("MAX_UPLOAD_MB must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.env == AppEnv::Development
    }

    /// `SERVER_URL` when set, otherwise the bound address
    pub fn public_base_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            env: AppEnv::Development,
            frontend_url: "http://localhost:3000".to_string(),
            server_url: None,
            upload_dir: "uploads/tmp".to_string(),
            reports_dir: "reports".to_string(),
            max_upload_mb: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_aliases() {
        assert_eq!(AppEnv::parse("dev").unwrap(), AppEnv::Development);
        assert_eq!(AppEnv::parse("BETA").unwrap(), AppEnv::Beta);
        assert_eq!(AppEnv::parse("prod").unwrap(), AppEnv::Production);
        assert!(AppEnv::parse("staging").is_err());
    }

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_development());
    }

    #[test]
    fn test_public_base_url_falls_back_to_bind_address() {
        let mut config = AppConfig::default();
        assert_eq!(config.public_base_url(), "http://127.0.0.1:5000");
        config.server_url = Some("https://api.example.org".to_string());
        assert_eq!(config.public_base_url(), "https://api.example.org");
    }
}
