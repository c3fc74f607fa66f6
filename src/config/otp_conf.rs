use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use crate::config::ConfigError;

/// One-time code settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Lifetime of a code, also used for the TTL index on `otps.createdAt`
    pub ttl_secs: u64,
    pub code_length: usize,
}

impl OtpConfig {
    /// Expected environment variables:
    /// - OTP_TTL_SECONDS (defaults to 600)
    /// - OTP_LENGTH (defaults to 6)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading OTP configuration from environment variables");
        let ttl_secs = env::var("OTP_TTL_SECONDS")
            .unwrap_or_else(|_| {
                warn!("OTP_TTL_SECONDS not set, using default: 600");
                "600".to_string()
            })
            .parse::<u64>()
            .map_err(|e| ConfigError::ParseError(format!("Invalid OTP_TTL_SECONDS: {}", e)))?;
        let code_length = env::var("OTP_LENGTH")
            .unwrap_or_else(|_| "6".to_string())
            .parse::<usize>()
            .map_err(|e| ConfigError::ParseError(format!("Invalid OTP_LENGTH: {}", e)))?;
        let config = Self { ttl_secs, code_length };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::ValidationError("OTP TTL must be greater than 0".to_string()));
        }
        if !(4..=10).contains(&self.code_length) {
            return Err(ConfigError::ValidationError("OTP length must be between 4 and 10".to_string()));
        }
        Ok(())
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { ttl_secs: 600, code_length: 6 }
    }
}
