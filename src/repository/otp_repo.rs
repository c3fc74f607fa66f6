use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database};
use std::time::Duration;
use tracing::instrument;

use crate::model::otp::{Otp, OtpPurpose};
use crate::repository::mongo::create_index;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Stores `otp` after removing any earlier code for the same email and purpose
    async fn replace(&self, otp: Otp) -> RepositoryResult<Otp>;
    async fn find(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<Option<Otp>>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()>;
}

pub struct MongoOtpRepository {
    collection: Collection<Otp>,
}

impl MongoOtpRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Otp>("otps"),
        }
    }

    /// The TTL index lets MongoDB drop codes `ttl_secs` after creation
    pub async fn ensure_indexes(&self, ttl_secs: u64) -> RepositoryResult<()> {
        create_index(
            &self.collection,
            doc! { "createdAt": 1 },
            Some(IndexOptions::builder().expire_after(Duration::from_secs(ttl_secs)).build()),
        )
        .await?;
        create_index(&self.collection, doc! { "email": 1, "purpose": 1 }, None).await
    }
}

#[async_trait]
impl OtpRepository for MongoOtpRepository {
    #[instrument(skip(self, otp), fields(email = %otp.email, purpose = %otp.purpose))]
    async fn replace(&self, mut otp: Otp) -> RepositoryResult<Otp> {
        self.collection
            .delete_many(doc! { "email": &otp.email, "purpose": otp.purpose.as_str() }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to clear previous codes: {}", e)))?;
        otp.id = Some(ObjectId::new());
        self.collection
            .insert_one(&otp, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to store code: {}", e)))?;
        Ok(otp)
    }

    async fn find(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<Option<Otp>> {
        self.collection
            .find_one(doc! { "email": email, "purpose": purpose.as_str() }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find code: {}", e)))
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        self.collection
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete code: {}", e)))?;
        Ok(())
    }
}
