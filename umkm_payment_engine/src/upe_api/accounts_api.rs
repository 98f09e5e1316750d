//! Read models over the ledger.

use std::fmt::Debug;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        AuditLogEntry,
        Merchant,
        Order,
        OrderId,
        OrderStatusLog,
        Payment,
        Rupiah,
        Wallet,
        WalletTransaction,
        WithdrawRequest,
    },
    traits::{AccountApiError, AccountManagement},
};

/// An order together with its payment record and status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub payment: Option<Payment>,
    pub history: Vec<OrderStatusLog>,
}

/// A wallet and every ledger entry that touched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletHistory {
    pub wallet: Wallet,
    pub transactions: Vec<WalletTransaction>,
}

impl WalletHistory {
    /// Replays every ledger entry from an empty wallet and returns the resulting `(pending, available)` balances.
    pub fn ledger_balances(&self) -> (Rupiah, Rupiah) {
        self.transactions.iter().fold((Rupiah::default(), Rupiah::default()), |(pending, available), tx| {
            let (dp, da) = tx.kind.deltas(tx.amount);
            (pending + dp, available + da)
        })
    }

    /// True if replaying the ledger reproduces both stored balances.
    pub fn is_consistent(&self) -> bool {
        self.ledger_balances() == (self.wallet.balance_pending, self.wallet.balance_available)
    }
}

/// The `AccountApi` provides a unified API for the read side of the ledger.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the order with its payment and status history. If the order does not exist, `None` is returned.
    pub async fn order_details(&self, order_id: OrderId) -> Result<Option<OrderDetails>, AccountApiError> {
        let Some(order) = self.db.fetch_order(order_id).await? else {
            return Ok(None);
        };
        let payment = self.db.fetch_payment_for_order(order_id).await?;
        let history = self.db.fetch_order_status_log(order_id).await?;
        Ok(Some(OrderDetails { order, payment, history }))
    }

    pub async fn orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, AccountApiError> {
        self.db.fetch_orders_for_buyer(buyer_id).await
    }

    pub async fn orders_for_merchant(&self, merchant_id: i64) -> Result<Vec<Order>, AccountApiError> {
        self.db.fetch_orders_for_merchant(merchant_id).await
    }

    pub async fn merchant_for_user(&self, user_id: i64) -> Result<Option<Merchant>, AccountApiError> {
        self.db.fetch_merchant_for_user(user_id).await
    }

    pub async fn wallet_for_merchant(&self, merchant_id: i64) -> Result<Option<Wallet>, AccountApiError> {
        self.db.fetch_wallet_for_merchant(merchant_id).await
    }

    /// Fetches the merchant's wallet and its full ledger. Returns `None` if the merchant has no wallet yet.
    pub async fn wallet_history(&self, merchant_id: i64) -> Result<Option<WalletHistory>, AccountApiError> {
        let Some(wallet) = self.db.fetch_wallet_for_merchant(merchant_id).await? else {
            return Ok(None);
        };
        let transactions = self.db.fetch_wallet_transactions(wallet.id).await?;
        trace!("Wallet #{} has {} ledger entries", wallet.id, transactions.len());
        Ok(Some(WalletHistory { wallet, transactions }))
    }

    pub async fn withdrawals_for_merchant(&self, merchant_id: i64) -> Result<Vec<WithdrawRequest>, AccountApiError> {
        self.db.fetch_withdrawals_for_merchant(merchant_id).await
    }

    /// The most recent audit entries, newest first. `limit` is clamped to `1..=500`.
    pub async fn audit_logs(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AccountApiError> {
        self.db.fetch_audit_logs(limit.clamp(1, 500)).await
    }
}
