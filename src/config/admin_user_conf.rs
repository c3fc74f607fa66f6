use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;

/// Credentials of the administrator seeded on first start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl AdminUserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = AdminUserConfig {
            username: env::var("ADMIN_USERNAME").map_err(|_| ConfigError::EnvVarNotFound("ADMIN_USERNAME".to_string()))?,
            name: env::var("ADMIN_NAME").unwrap_or_else(|_| "System Administrator".to_string()),
            email: env::var("ADMIN_EMAIL").map_err(|_| ConfigError::EnvVarNotFound("ADMIN_EMAIL".to_string()))?,
            password: env::var("ADMIN_PASSWORD").map_err(|_| ConfigError::EnvVarNotFound("ADMIN_PASSWORD".to_string()))?,
        };
        if config.password.len() < 6 {
            return Err(ConfigError::ValidationError("ADMIN_PASSWORD must be at least 6 characters".to_string()));
        }
        Ok(config)
    }
}
