use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Identifier the dashboard uses for the row, unique per payout
    pub external_id: String,
    pub date: String,
    pub worker_count: i64,
    pub daily_wage: f64,
    pub total_wage: f64,
    pub status: PayoutStatus,
    #[serde(default)]
    pub approved_by: Option<ObjectId>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

pub fn total_wage(worker_count: i64, daily_wage: f64) -> f64 {
    worker_count as f64 * daily_wage
}
