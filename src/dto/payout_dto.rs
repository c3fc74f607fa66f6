use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::payout::{Payout, PayoutStatus};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayoutRequest {
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,
    #[validate(range(min = 1, message = "Worker count must be at least 1"))]
    pub worker_count: i64,
    #[validate(range(min = 0.0, message = "Daily wage cannot be negative"))]
    pub daily_wage: f64,
    pub status: PayoutStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutUpdateResponse {
    pub external_id: String,
    pub status: PayoutStatus,
    /// Only approved payouts are kept
    pub stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<Payout>,
}
