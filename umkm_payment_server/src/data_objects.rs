use std::fmt::Display;

use serde::{Deserialize, Serialize};
use umkm_payment_engine::db_types::{Wallet, WithdrawRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipOrderParams {
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingParams {
    pub tracking_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeParams {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveDisputeParams {
    /// `REFUND` or `RELEASE`
    pub decision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectMerchantParams {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub request: WithdrawRequest,
    pub wallet: Wallet,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<i64>,
}

impl AuditLogQuery {
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}
