use thiserror::Error;

use crate::db_types::{
    AuditLogEntry,
    Dispute,
    Merchant,
    Order,
    OrderId,
    OrderStatusLog,
    Payment,
    Wallet,
    WalletTransaction,
    WithdrawRequest,
};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// Read-only queries over orders, wallets, disputes and the other records the ledger maintains.
///
/// None of these methods mutate state, and none of them create a wallet on demand. A merchant that has never been
/// approved or paid simply has no wallet yet, and `None` is returned.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, AccountApiError>;

    /// Fetches every order in `ids` that exists. Missing ids are silently skipped.
    async fn fetch_orders(&self, ids: &[OrderId]) -> Result<Vec<Order>, AccountApiError>;

    /// Orders placed by the given buyer, newest first.
    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, AccountApiError>;

    /// Orders received by the given merchant, newest first.
    async fn fetch_orders_for_merchant(&self, merchant_id: i64) -> Result<Vec<Order>, AccountApiError>;

    async fn fetch_order_status_log(&self, order_id: OrderId) -> Result<Vec<OrderStatusLog>, AccountApiError>;

    async fn fetch_payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, AccountApiError>;

    async fn fetch_merchant(&self, merchant_id: i64) -> Result<Option<Merchant>, AccountApiError>;

    /// The merchant profile owned by the given user, if any.
    async fn fetch_merchant_for_user(&self, user_id: i64) -> Result<Option<Merchant>, AccountApiError>;

    async fn fetch_pending_merchants(&self) -> Result<Vec<Merchant>, AccountApiError>;

    async fn fetch_wallet_for_merchant(&self, merchant_id: i64) -> Result<Option<Wallet>, AccountApiError>;

    /// Ledger entries for the wallet, oldest first.
    async fn fetch_wallet_transactions(&self, wallet_id: i64) -> Result<Vec<WalletTransaction>, AccountApiError>;

    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, AccountApiError>;

    async fn fetch_open_disputes(&self) -> Result<Vec<Dispute>, AccountApiError>;

    async fn fetch_withdrawals_for_merchant(&self, merchant_id: i64) -> Result<Vec<WithdrawRequest>, AccountApiError>;

    /// The most recent `limit` audit log entries, newest first.
    async fn fetch_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AccountApiError>;
}
