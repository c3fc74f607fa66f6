use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use tracing::{error, info, instrument};

use crate::model::user::{Role, User};
use crate::repository::mongo::{create_index, unique};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::time;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    /// Replaces every field except `_id` and `createdAt`
    async fn update(&self, user: User) -> RepositoryResult<User>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<bool>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    /// Matches either the username or the (lowercased) email
    async fn find_by_login(&self, identifier: &str) -> RepositoryResult<Option<User>>;
    /// Newest first
    async fn list_by_roles(&self, roles: &[Role]) -> RepositoryResult<Vec<User>>;
    async fn set_session(&self, id: &ObjectId, refresh_token: Option<String>, last_login: Option<String>) -> RepositoryResult<()>;
    async fn set_password_hash(&self, email: &str, password_hash: &str) -> RepositoryResult<bool>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<User>("users"),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_index(&self.collection, doc! { "username": 1 }, unique()).await?;
        create_index(&self.collection, doc! { "email": 1 }, unique()).await?;
        create_index(&self.collection, doc! { "role": 1 }, None).await
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username, role = %user.role))]
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        user.id = Some(ObjectId::new());
        let now = time::now();
        user.created_at = Some(now.clone());
        user.updated_at = Some(now);
        self.collection.insert_one(&user, None).await.map_err(|e| {
            error!("Failed to insert user: {}", e);
            RepositoryError::from(e)
        })?;
        info!("User created");
        Ok(user)
    }

    #[instrument(skip(self, user), fields(id = ?user.id))]
    async fn update(&self, mut user: User) -> RepositoryResult<User> {
        let id = user
            .id
            .ok_or_else(|| RepositoryError::validation("User has no id"))?;
        user.updated_at = Some(time::now());

        let mut fields = bson::to_document(&user)?;
        fields.remove("_id");
        fields.remove("createdAt");

        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await
            .map_err(RepositoryError::from)?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("No user found to update for ID: {}", id)));
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete user: {}", e)))?;
        Ok(result.deleted_count > 0)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by id: {}", e)))
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.collection
            .find_one(doc! { "email": email.trim().to_lowercase() }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by email: {}", e)))
    }

    async fn find_by_login(&self, identifier: &str) -> RepositoryResult<Option<User>> {
        let identifier = identifier.trim();
        let filter = doc! {
            "$or": [
                { "username": identifier },
                { "email": identifier.to_lowercase() },
            ]
        };
        self.collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user: {}", e)))
    }

    #[instrument(skip(self))]
    async fn list_by_roles(&self, roles: &[Role]) -> RepositoryResult<Vec<User>> {
        let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self
            .collection
            .find(doc! { "role": { "$in": roles } }, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list users: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read users: {}", e)))
    }

    async fn set_session(&self, id: &ObjectId, refresh_token: Option<String>, last_login: Option<String>) -> RepositoryResult<()> {
        let mut fields = doc! { "refreshToken": refresh_token, "updatedAt": time::now() };
        if let Some(last_login) = last_login {
            fields.insert("lastLogin", last_login);
        }
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to update session: {}", e)))?;
        Ok(())
    }

    async fn set_password_hash(&self, email: &str, password_hash: &str) -> RepositoryResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "email": email.trim().to_lowercase() },
                doc! { "$set": { "passwordHash": password_hash, "updatedAt": time::now() } },
                None,
            )
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to update password: {}", e)))?;
        Ok(result.matched_count > 0)
    }
}
