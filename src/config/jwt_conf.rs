use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// JWT configuration structure
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret used to sign access tokens
    pub jwt_secret: String,
    /// Secret used to sign refresh tokens, falls back to `jwt_secret`
    pub refresh_secret: String,
    /// Access token expiration time in minutes
    pub access_token_expiration: i64,
    /// Refresh token expiration time in minutes
    pub refresh_token_expiration: i64,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables
    ///
    /// Expected environment variables:
    /// - JWT_SECRET: Secret key for signing JWT tokens (required, 32+ chars)
    /// - JWT_REFRESH_SECRET: Secret for refresh tokens (optional)
    /// - JWT_ACCESS_TOKEN_EXPIRY: Access token expiration in minutes (defaults to 1440)
    /// - JWT_REFRESH_TOKEN_EXPIRY: Refresh token expiration in minutes (defaults to 10080 = 1 week)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading JWT configuration from environment variables");

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            error!("JWT_SECRET environment variable not found");
            ConfigError::EnvVarNotFound("JWT_SECRET".to_string())
        })?;
        debug!("JWT secret loaded (length: {} chars)", jwt_secret.len());

        let refresh_secret = env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| {
            warn!("JWT_REFRESH_SECRET not set, refresh tokens share JWT_SECRET");
            jwt_secret.clone()
        });

        let access_token_expiration = Self::minutes_from_env("JWT_ACCESS_TOKEN_EXPIRY", 1440)?;
        debug!("JWT access token expiration: {} minutes", access_token_expiration);

        let refresh_token_expiration = Self::minutes_from_env("JWT_REFRESH_TOKEN_EXPIRY", 10080)?;
        debug!("JWT refresh token expiration: {} minutes", refresh_token_expiration);

        let config = JwtConfig {
            jwt_secret,
            refresh_secret,
            access_token_expiration,
            refresh_token_expiration,
        };
        config.validate()?;
        info!("JWT configuration loaded successfully");
        Ok(config)
    }

    fn minutes_from_env(name: &str, default: i64) -> Result<i64, ConfigError> {
        match env::var(name) {
            Ok(raw) => raw.parse::<i64>().map_err(|e| {
                error!("Invalid {} value: {}", name, e);
                ConfigError::ParseError(format!("{}: {}", name, e))
            }),
            Err(_) => {
                warn!("{} not set, using default: {} minutes", name, default);
                Ok(default)
            }
        }
    }

    /// Validate the JWT configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!("Validating JWT configuration");

        if self.jwt_secret.len() < 32 || self.refresh_secret.len() < 32 {
            error!("JWT secret is too short (minimum 32 characters required)");
            return Err(ConfigError::ValidationError(
                "JWT secrets must be at least 32 characters long".to_string(),
            ));
        }
        if self.access_token_expiration <= 0 || self.refresh_token_expiration <= 0 {
            error!("Token expiration must be greater than 0");
            return Err(ConfigError::ValidationError(
                "Token expiration must be greater than 0".to_string(),
            ));
        }
        if self.access_token_expiration >= self.refresh_token_expiration {
            warn!("Access token expiration is greater than or equal to refresh token expiration");
        }
        Ok(())
    }

    /// Fixed configuration for unit and integration tests
    pub fn for_tests() -> Self {
        JwtConfig {
            jwt_secret: "test-access-secret-that-is-long-enough-1234".to_string(),
            refresh_secret: "test-refresh-secret-that-is-long-enough-5678".to_string(),
            access_token_expiration: 15,
            refresh_token_expiration: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_tests_is_valid() {
        assert!(JwtConfig::for_tests().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = JwtConfig::for_tests();
        config.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_expiration_rejected() {
        let mut config = JwtConfig::for_tests();
        config.access_token_expiration = 0;
        assert!(config.validate().is_err());
    }
}
