use async_trait::async_trait;
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::config::{AdminUserConfig, OtpConfig};
use crate::dto::auth_dto::{
    AuthResponse, LoginRequest, OtpRequest, SignupRequest, TokenResponse, UpdatePasswordRequest, VerifyOtpRequest,
};
use crate::model::otp::{Otp, OtpPurpose};
use crate::model::user::{Role, User, UserProfile};
use crate::repository::otp_repo::OtpRepository;
use crate::repository::user_repo::UserRepository;
use crate::util::email::Mailer;
use crate::util::error::ServiceError;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl, TokenPair};
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};
use crate::util::redis::{session_key, RedisServiceTrait};
use crate::util::time;

/// Redis key that lets `email` set a new password once
pub fn password_reset_key(email: &str) -> String {
    format!("password_reset:{}", email.trim().to_lowercase())
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError>;
    async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, ServiceError>;
    async fn request_otp(&self, request: OtpRequest) -> Result<(), ServiceError>;
    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<(), ServiceError>;
    async fn update_password(&self, request: UpdatePasswordRequest) -> Result<(), ServiceError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, ServiceError>;
    async fn logout(&self, user_id: &ObjectId) -> Result<(), ServiceError>;
    async fn me(&self, user_id: &ObjectId) -> Result<UserProfile, ServiceError>;
    /// Resolves a bearer access token to an active user
    async fn authenticate(&self, token: &str) -> Result<User, ServiceError>;
}

pub struct AuthServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
    pub otp_repo: Arc<dyn OtpRepository>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub redis: Arc<dyn RedisServiceTrait>,
    pub mailer: Arc<dyn Mailer>,
    pub otp_config: OtpConfig,
    pub session_ttl_secs: u64,
}

impl AuthServiceImpl {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        otp_repo: Arc<dyn OtpRepository>,
        jwt_utils: Arc<JwtTokenUtilsImpl>,
        redis: Arc<dyn RedisServiceTrait>,
        mailer: Arc<dyn Mailer>,
        otp_config: OtpConfig,
        session_ttl_secs: u64,
    ) -> Self {
        Self {
            user_repo,
            otp_repo,
            jwt_utils,
            redis,
            mailer,
            otp_config,
            session_ttl_secs,
        }
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair, ServiceError> {
        self.jwt_utils
            .generate_token_pair(&user.id_hex(), &user.email, user.role.as_str())
            .map_err(|e| ServiceError::InternalError(format!("Token generation failed: {}", e)))
    }

    /// Stores the refresh token and caches the session. A Redis outage only logs.
    async fn open_session(&self, mut user: User) -> Result<AuthResponse, ServiceError> {
        let id = user
            .id
            .ok_or_else(|| ServiceError::InternalError("User has no id".to_string()))?;
        let tokens = self.issue_tokens(&user)?;
        let now = time::now();
        self.user_repo
            .set_session(&id, Some(tokens.refresh_token.clone()), Some(now.clone()))
            .await?;
        user.last_login = Some(now);
        user.refresh_token = Some(tokens.refresh_token.clone());

        let profile = UserProfile::from(&user);
        match serde_json::to_string(&profile) {
            Ok(session) => {
                if let Err(e) = self
                    .redis
                    .set_string_with_expiry(&session_key(&profile.id), &session, self.session_ttl_secs)
                    .await
                {
                    warn!(user_id = %profile.id, "Failed to cache session: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize session: {}", e),
        }

        Ok(AuthResponse {
            user: profile,
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        })
    }

    async fn ensure_unique(&self, email: &str, username: &str) -> Result<(), ServiceError> {
        if self.user_repo.find_by_email(email).await?.is_some() || self.user_repo.find_by_login(username).await?.is_some()
        {
            return Err(ServiceError::InvalidInput("User already exists".to_string()));
        }
        Ok(())
    }

    /// Inserts the first admin from `ADMIN_*` settings unless that email is taken
    #[instrument(skip(self, config), fields(email = %config.email))]
    pub async fn seed_admin(&self, config: &AdminUserConfig) -> Result<bool, ServiceError> {
        if self.user_repo.find_by_email(&config.email).await?.is_some() {
            info!("Admin user already exists, skipping creation");
            return Ok(false);
        }
        let mut user = User::new(&config.username, &config.email, &config.name, Role::Admin);
        user.password_hash = PasswordUtilsImpl::hash_password(&config.password)
            .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))?;
        self.user_repo.insert(user).await?;
        info!("First admin user created");
        Ok(true)
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid credentials".to_string());
        let user = self
            .user_repo
            .find_by_login(&request.username)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;

        match PasswordUtilsImpl::verify_password(&request.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(invalid()),
            Err(e) => {
                warn!(user_id = %user.id_hex(), "Stored password hash unusable: {}", e);
                return Err(invalid());
            }
        }

        let response = self.open_session(user).await?;
        info!(user_id = %response.user.id, role = %response.user.role, "User logged in");
        Ok(response)
    }

    #[instrument(skip(self, request), fields(username = %request.username, email = %request.email))]
    async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, ServiceError> {
        self.ensure_unique(&request.email, &request.username).await?;

        let mut user = User::new(&request.username, &request.email, &request.name, request.role);
        if let Some(department) = request.department.filter(|d| !d.trim().is_empty()) {
            user.department = department.trim().to_string();
        }
        user.password_hash = PasswordUtilsImpl::hash_password(&request.password)
            .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))?;

        let user = self.user_repo.insert(user).await.map_err(|e| match ServiceError::from(e) {
            ServiceError::Conflict(_) => ServiceError::InvalidInput("User already exists".to_string()),
            other => other,
        })?;

        if request.created_by_admin {
            if let Err(e) = self
                .mailer
                .send_credentials(&user.email, &user.name, &user.username, &request.password, user.role)
                .await
            {
                error!(email = %user.email, "Failed to send credentials: {}", e);
            }
        }

        info!(user_id = %user.id_hex(), "User signed up");
        self.open_session(user).await
    }

    #[instrument(skip(self, request), fields(email = %request.email, purpose = %request.purpose))]
    async fn request_otp(&self, request: OtpRequest) -> Result<(), ServiceError> {
        let email = request.email.trim().to_lowercase();
        let existing = self.user_repo.find_by_email(&email).await?;
        match (request.purpose, existing) {
            (OtpPurpose::Signup, Some(_)) => {
                return Err(ServiceError::InvalidInput("User already exists".to_string()));
            }
            (OtpPurpose::Login | OtpPurpose::ForgotPassword, None) => {
                return Err(ServiceError::NotFound("User not found".to_string()));
            }
            _ => {}
        }

        let code = PasswordUtilsImpl::generate_numeric_code(self.otp_config.code_length);
        self.otp_repo
            .replace(Otp {
                id: None,
                email: email.clone(),
                otp: code.clone(),
                purpose: request.purpose,
                created_at: bson::DateTime::now(),
            })
            .await?;

        self.mailer.send_otp(&email, &code, request.purpose).await.map_err(|e| {
            error!("Failed to send OTP: {}", e);
            ServiceError::Upstream("Failed to send OTP".to_string())
        })?;
        info!("OTP sent");
        Ok(())
    }

    #[instrument(skip(self, request), fields(email = %request.email, purpose = %request.purpose))]
    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<(), ServiceError> {
        let email = request.email.trim().to_lowercase();
        let invalid = || ServiceError::InvalidInput("Invalid or expired OTP".to_string());

        let otp = self.otp_repo.find(&email, request.purpose).await?.ok_or_else(invalid)?;
        if otp.otp != request.otp.trim() || otp.is_expired(bson::DateTime::now(), self.otp_config.ttl_secs) {
            return Err(invalid());
        }
        if let Some(id) = &otp.id {
            self.otp_repo.delete(id).await?;
        }

        if request.purpose == OtpPurpose::ForgotPassword {
            self.redis
                .set_string_with_expiry(&password_reset_key(&email), "verified", self.otp_config.ttl_secs)
                .await
                .map_err(|e| ServiceError::InternalError(format!("Failed to record verification: {}", e)))?;
        }
        info!("OTP verified");
        Ok(())
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn update_password(&self, request: UpdatePasswordRequest) -> Result<(), ServiceError> {
        let key = password_reset_key(&request.email);
        let granted = self
            .redis
            .delete(&key)
            .await
            .map_err(|e| ServiceError::InternalError(format!("Failed to check verification: {}", e)))?;
        if !granted {
            return Err(ServiceError::InvalidInput("OTP verification required".to_string()));
        }

        let hash = PasswordUtilsImpl::hash_password(&request.new_password)
            .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))?;
        if !self.user_repo.set_password_hash(&request.email, &hash).await? {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }
        info!("Password updated");
        Ok(())
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid refresh token".to_string());
        let claims = self.jwt_utils.validate_refresh_token(refresh_token).map_err(|e| {
            warn!("Refresh token rejected: {}", e);
            invalid()
        })?;
        let id = ObjectId::parse_str(&claims.sub).map_err(|_| invalid())?;
        let user = self
            .user_repo
            .find_by_id(&id)
            .await?
            .filter(|u| u.is_active && u.refresh_token.as_deref() == Some(refresh_token))
            .ok_or_else(invalid)?;

        let tokens = self.issue_tokens(&user)?;
        self.user_repo
            .set_session(&id, Some(tokens.refresh_token.clone()), None)
            .await?;
        info!(user_id = %claims.sub, "Tokens refreshed");
        Ok(TokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        })
    }

    #[instrument(skip(self))]
    async fn logout(&self, user_id: &ObjectId) -> Result<(), ServiceError> {
        self.user_repo.set_session(user_id, None, None).await?;
        if let Err(e) = self.redis.delete(&session_key(&user_id.to_hex())).await {
            warn!("Failed to drop cached session: {}", e);
        }
        info!("User logged out");
        Ok(())
    }

    async fn me(&self, user_id: &ObjectId) -> Result<UserProfile, ServiceError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        Ok(UserProfile::from(&user))
    }

    async fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self
            .jwt_utils
            .validate_access_token(token)
            .map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))?;
        let id = ObjectId::parse_str(&claims.sub).map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))?;
        self.user_repo
            .find_by_id(&id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ServiceError::Unauthorized("User not found or inactive".to_string()))
    }
}
