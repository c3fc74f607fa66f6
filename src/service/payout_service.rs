use async_trait::async_trait;
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::dto::payout_dto::{PayoutUpdateResponse, UpdatePayoutRequest};
use crate::model::payout::{total_wage, Payout, PayoutStatus};
use crate::repository::payout_repo::PayoutRepository;
use crate::util::error::ServiceError;

#[async_trait]
pub trait PayoutService: Send + Sync {
    async fn list_payouts(&self) -> Result<Vec<Payout>, ServiceError>;
    /// Approved payouts are upserted; any other status removes the stored record
    async fn update_payout(
        &self,
        external_id: &str,
        request: UpdatePayoutRequest,
        actor: ObjectId,
    ) -> Result<PayoutUpdateResponse, ServiceError>;
    async fn delete_payout(&self, external_id: &str) -> Result<(), ServiceError>;
}

pub struct PayoutServiceImpl {
    pub payout_repo: Arc<dyn PayoutRepository>,
}

impl PayoutServiceImpl {
    pub fn new(payout_repo: Arc<dyn PayoutRepository>) -> Self {
        Self { payout_repo }
    }
}

#[async_trait]
impl PayoutService for PayoutServiceImpl {
    async fn list_payouts(&self) -> Result<Vec<Payout>, ServiceError> {
        Ok(self.payout_repo.list().await?)
    }

    #[instrument(skip(self, request), fields(status = ?request.status))]
    async fn update_payout(
        &self,
        external_id: &str,
        request: UpdatePayoutRequest,
        actor: ObjectId,
    ) -> Result<PayoutUpdateResponse, ServiceError> {
        if request.status != PayoutStatus::Approved {
            let removed = self.payout_repo.delete_by_external_id(external_id).await?;
            info!(removed, "Payout not approved, not stored");
            return Ok(PayoutUpdateResponse {
                external_id: external_id.to_string(),
                status: request.status,
                stored: false,
                payout: None,
            });
        }

        let payout = self
            .payout_repo
            .upsert(Payout {
                id: None,
                external_id: external_id.to_string(),
                date: request.date.trim().to_string(),
                worker_count: request.worker_count,
                daily_wage: request.daily_wage,
                total_wage: total_wage(request.worker_count, request.daily_wage),
                status: PayoutStatus::Approved,
                approved_by: Some(actor),
                created_at: None,
                updated_at: None,
            })
            .await?;
        info!(total_wage = payout.total_wage, "Payout approved");
        Ok(PayoutUpdateResponse {
            external_id: payout.external_id.clone(),
            status: payout.status,
            stored: true,
            payout: Some(payout),
        })
    }

    #[instrument(skip(self))]
    async fn delete_payout(&self, external_id: &str) -> Result<(), ServiceError> {
        if !self.payout_repo.delete_by_external_id(external_id).await? {
            return Err(ServiceError::NotFound("Payout not found".to_string()));
        }
        info!("Payout deleted");
        Ok(())
    }
}
