use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info};

use crate::config::ConfigError;

/// Fixed-window API rate limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_minutes: u64,
    pub max_requests: i64,
    /// Separate budget for the detection webhook
    pub webhook_max_requests: i64,
}

impl RateLimitConfig {
    /// Expected environment variables:
    /// - RATE_LIMIT_WINDOW: window length in minutes (defaults to 15)
    /// - RATE_LIMIT_MAX: requests per window and client (defaults to 100)
    /// - RATE_LIMIT_WEBHOOK_MAX: webhook requests per window and client (defaults to 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading rate limit configuration from environment variables");
        let window_minutes = parse_var("RATE_LIMIT_WINDOW", 15)?;
        let max_requests = parse_var("RATE_LIMIT_MAX", 100)?;
        let webhook_max_requests = parse_var("RATE_LIMIT_WEBHOOK_MAX", 1000)?;
        debug!(
            "Rate limit: {} requests / {} min (webhook {})",
            max_requests, window_minutes, webhook_max_requests
        );
        let config = Self {
            window_minutes,
            max_requests,
            webhook_max_requests,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_minutes == 0 {
            return Err(ConfigError::ValidationError("RATE_LIMIT_WINDOW must be greater than 0".to_string()));
        }
        if self.max_requests <= 0 || self.webhook_max_requests <= 0 {
            return Err(ConfigError::ValidationError("Rate limits must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn window_secs(&self) -> u64 {
        self.window_minutes * 60
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_minutes: 15,
            max_requests: 100,
            webhook_max_requests: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.window_secs(), 900);
        assert_eq!(config.max_requests, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = RateLimitConfig { window_minutes: 0, ..RateLimitConfig::default() };
        assert!(config.validate().is_err());
    }
}
