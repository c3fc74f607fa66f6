use async_trait::async_trait;
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::dto::manager_dto::{ToggleStatusResponse, UpdateManagerRequest};
use crate::model::user::{Role, User, UserProfile};
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};
use crate::util::redis::{session_key, RedisServiceTrait};

pub fn status_label(is_active: bool) -> &'static str {
    if is_active {
        "active"
    } else {
        "inactive"
    }
}

#[async_trait]
pub trait ManagerService: Send + Sync {
    async fn list_managers(&self) -> Result<Vec<UserProfile>, ServiceError>;
    async fn update_manager(&self, id: &str, request: UpdateManagerRequest) -> Result<UserProfile, ServiceError>;
    async fn delete_manager(&self, id: &str) -> Result<(), ServiceError>;
    async fn toggle_status(&self, id: &str) -> Result<ToggleStatusResponse, ServiceError>;
}

pub struct ManagerServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
    pub redis: Arc<dyn RedisServiceTrait>,
}

impl ManagerServiceImpl {
    pub fn new(user_repo: Arc<dyn UserRepository>, redis: Arc<dyn RedisServiceTrait>) -> Self {
        Self { user_repo, redis }
    }

    /// Admin accounts are not managers and are reported as missing
    async fn find_manager(&self, id: &str) -> Result<User, ServiceError> {
        let not_found = || ServiceError::NotFound("Manager not found".to_string());
        let oid = ObjectId::parse_str(id).map_err(|_| not_found())?;
        self.user_repo
            .find_by_id(&oid)
            .await?
            .filter(|u| u.role != Role::Admin)
            .ok_or_else(not_found)
    }

    async fn drop_session(&self, user: &User) {
        if let Err(e) = self.redis.delete(&session_key(&user.id_hex())).await {
            warn!(user_id = %user.id_hex(), "Failed to drop cached session: {}", e);
        }
    }
}

#[async_trait]
impl ManagerService for ManagerServiceImpl {
    async fn list_managers(&self) -> Result<Vec<UserProfile>, ServiceError> {
        let users = self.user_repo.list_by_roles(&Role::MANAGERS).await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    #[instrument(skip(self, request))]
    async fn update_manager(&self, id: &str, request: UpdateManagerRequest) -> Result<UserProfile, ServiceError> {
        let mut user = self.find_manager(id).await?;

        if let Some(name) = request.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = request.email {
            user.email = email.trim().to_lowercase();
        }
        if let Some(username) = request.username {
            user.username = username.trim().to_string();
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(department) = request.department {
            user.department = department.trim().to_string();
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }
        if let Some(password) = request.password.filter(|p| !p.trim().is_empty()) {
            user.password_hash = PasswordUtilsImpl::hash_password(&password)
                .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))?;
        }

        let user = self.user_repo.update(user).await?;
        if !user.is_active {
            self.drop_session(&user).await;
        }
        info!(user_id = %user.id_hex(), "Manager updated");
        Ok(UserProfile::from(&user))
    }

    #[instrument(skip(self))]
    async fn delete_manager(&self, id: &str) -> Result<(), ServiceError> {
        let user = self.find_manager(id).await?;
        let oid = user
            .id
            .ok_or_else(|| ServiceError::InternalError("User has no id".to_string()))?;
        if !self.user_repo.delete(&oid).await? {
            return Err(ServiceError::NotFound("Manager not found".to_string()));
        }
        self.drop_session(&user).await;
        info!(user_id = %user.id_hex(), "Manager deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn toggle_status(&self, id: &str) -> Result<ToggleStatusResponse, ServiceError> {
        let mut user = self.find_manager(id).await?;
        user.is_active = !user.is_active;
        let user = self.user_repo.update(user).await?;
        if !user.is_active {
            self.drop_session(&user).await;
        }
        info!(user_id = %user.id_hex(), is_active = user.is_active, "Manager status toggled");
        Ok(ToggleStatusResponse {
            id: user.id_hex(),
            is_active: user.is_active,
            status: status_label(user.is_active).to_string(),
        })
    }
}
