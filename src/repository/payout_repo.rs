use async_trait::async_trait;
use bson::doc;
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database};
use tracing::{info, instrument};

use crate::model::payout::Payout;
use crate::repository::mongo::{create_index, unique};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::time;

#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Newest date first
    async fn list(&self) -> RepositoryResult<Vec<Payout>>;
    /// Inserts or replaces the payout identified by `externalId`
    async fn upsert(&self, payout: Payout) -> RepositoryResult<Payout>;
    async fn delete_by_external_id(&self, external_id: &str) -> RepositoryResult<bool>;
}

pub struct MongoPayoutRepository {
    collection: Collection<Payout>,
}

impl MongoPayoutRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Payout>("payouts"),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_index(&self.collection, doc! { "externalId": 1 }, unique()).await?;
        create_index(&self.collection, doc! { "date": -1 }, None).await
    }
}

#[async_trait]
impl PayoutRepository for MongoPayoutRepository {
    async fn list(&self) -> RepositoryResult<Vec<Payout>> {
        let options = FindOptions::builder().sort(doc! { "date": -1, "createdAt": -1 }).build();
        let cursor = self
            .collection
            .find(None, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list payouts: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read payouts: {}", e)))
    }

    #[instrument(skip(self, payout), fields(external_id = %payout.external_id))]
    async fn upsert(&self, payout: Payout) -> RepositoryResult<Payout> {
        let now = time::now();
        let mut fields = bson::to_document(&payout)?;
        fields.remove("_id");
        fields.remove("createdAt");
        fields.insert("updatedAt", now.as_str());

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let stored = self
            .collection
            .find_one_and_update(
                doc! { "externalId": &payout.external_id },
                doc! { "$set": fields, "$setOnInsert": { "createdAt": now.as_str() } },
                options,
            )
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to upsert payout: {}", e)))?
            .ok_or_else(|| RepositoryError::database("Payout missing after upsert"))?;
        info!("Payout stored");
        Ok(stored)
    }

    async fn delete_by_external_id(&self, external_id: &str) -> RepositoryResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "externalId": external_id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete payout: {}", e)))?;
        Ok(result.deleted_count > 0)
    }
}
