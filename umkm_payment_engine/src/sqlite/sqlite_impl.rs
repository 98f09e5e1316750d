//! `SqliteDatabase` is a concrete implementation of an escrow ledger backend.
//!
//! It uses SQLite as the backend and implements all the traits defined in the [`crate::traits`] module. Every
//! mutating method runs in its own transaction. Dropping a `sqlx::Transaction` without committing rolls it back, so
//! any early return with `?` leaves the database untouched.
use std::fmt::Debug;

use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{
    audit_log,
    db_url,
    disputes,
    merchants,
    new_pool,
    orders::{self, OrderScope},
    payments,
    wallets::{self, LedgerPrimitive},
    withdrawals,
};
use crate::{
    db_types::{
        AuditLogEntry,
        Dispute,
        DisputeDecision,
        Merchant,
        MerchantStatus,
        NewAuditLogEntry,
        NewMerchant,
        NewOrder,
        NewPayment,
        NewWithdrawal,
        Order,
        OrderId,
        OrderStatusLog,
        OrderStatusType,
        Payment,
        PaymentStatus,
        Wallet,
        WalletTransaction,
        WithdrawRequest,
    },
    order_state::OrderTransition,
    traits::{
        AccountApiError,
        AccountManagement,
        LedgerMovement,
        OrderPaymentOutcome,
        PaymentGatewayDatabase,
        PaymentGatewayError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `UMS_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

/// Works out why a guarded order transition matched no rows.
async fn rejected_transition(
    id: OrderId,
    transition: OrderTransition,
    scope: OrderScope,
    conn: &mut SqliteConnection,
) -> PaymentGatewayError {
    match orders::fetch_scoped_order(id, scope, conn).await {
        Ok(Some(order)) => match transition.check(&order) {
            Err(e) => e.into(),
            Ok(_) => PaymentGatewayError::PreconditionFailed(format!("Order {id} was modified concurrently")),
        },
        Ok(None) => PaymentGatewayError::OrderNotFound(id),
        Err(e) => e.into(),
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let merchant = merchants::insert_merchant(merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(merchant)
    }

    async fn approve_merchant(&self, merchant_id: i64) -> Result<(Merchant, Wallet), PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let approved = merchants::decide_pending_merchant(merchant_id, MerchantStatus::Active, None, &mut tx).await?;
        let merchant = match approved {
            Some(m) => m,
            None => {
                let existing = merchants::fetch_merchant(merchant_id, &mut tx).await?;
                return Err(match existing {
                    Some(m) => PaymentGatewayError::PreconditionFailed(format!(
                        "Merchant #{merchant_id} is {}. Only PENDING merchants can be approved",
                        m.status
                    )),
                    None => PaymentGatewayError::MerchantNotFound(merchant_id),
                });
            },
        };
        let wallet = wallets::fetch_or_create_wallet(merchant_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Merchant #{merchant_id} approved. Wallet #{} is ready", wallet.id);
        Ok((merchant, wallet))
    }

    async fn reject_merchant(&self, merchant_id: i64, reason: &str) -> Result<Merchant, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let rejected =
            merchants::decide_pending_merchant(merchant_id, MerchantStatus::Rejected, Some(reason), &mut tx).await?;
        match rejected {
            Some(m) => {
                tx.commit().await?;
                debug!("🗃️ Merchant #{merchant_id} rejected: {reason}");
                Ok(m)
            },
            None => match merchants::fetch_merchant(merchant_id, &mut tx).await? {
                Some(m) => Err(PaymentGatewayError::PreconditionFailed(format!(
                    "Merchant #{merchant_id} is {}. Only PENDING merchants can be rejected",
                    m.status
                ))),
                None => Err(PaymentGatewayError::MerchantNotFound(merchant_id)),
            },
        }
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn apply_settlement(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<OrderPaymentOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let transitioned =
            orders::transition_order(order_id, OrderTransition::Pay, OrderScope::Any, None, &mut tx).await?;
        let order = match transitioned {
            Some(order) => order,
            None => {
                return match orders::fetch_order(order_id, &mut tx).await? {
                    Some(order) if order.is_paid() => {
                        debug!("🗃️ Order {order_id} is already paid. Skipping");
                        Ok(OrderPaymentOutcome::AlreadyPaid(order))
                    },
                    _ => Err(rejected_transition(order_id, OrderTransition::Pay, OrderScope::Any, &mut tx).await),
                };
            },
        };
        let payment = NewPayment::new(order.id, transaction_id, order.total_amount);
        let payment = match payments::insert_payment_if_absent(payment, &mut tx).await? {
            Some(p) => p,
            None => {
                tx.commit().await?;
                info!("🗃️ Order {order_id} marked paid, but a payment was already recorded. No credit applied");
                return Ok(OrderPaymentOutcome::PaymentAlreadyRecorded(order));
            },
        };
        let wallet = wallets::fetch_or_create_wallet(order.merchant_id, &mut tx).await?;
        let primitive = LedgerPrimitive::CreditPending(order.id);
        let wallet = wallets::apply(wallet.id, primitive, order.total_amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} paid. {} credited to wallet #{}", order.total_amount, wallet.id);
        Ok(OrderPaymentOutcome::Credited { order, payment, wallet })
    }

    async fn apply_payment_failure(&self, order_id: OrderId) -> Result<OrderPaymentOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let transitioned =
            orders::transition_order(order_id, OrderTransition::Fail, OrderScope::Any, None, &mut tx).await?;
        match transitioned {
            Some(order) => {
                tx.commit().await?;
                debug!("🗃️ Order {order_id} marked as failed");
                Ok(OrderPaymentOutcome::MarkedFailed(order))
            },
            None => match orders::fetch_order(order_id, &mut tx).await? {
                Some(order) if order.is_paid() => {
                    debug!("🗃️ Order {order_id} is already paid. Ignoring failure notification");
                    Ok(OrderPaymentOutcome::AlreadyPaid(order))
                },
                Some(order) if order.payment_status == PaymentStatus::Failed => {
                    debug!("🗃️ Order {order_id} has already failed. Skipping");
                    Ok(OrderPaymentOutcome::AlreadyFailed(order))
                },
                _ => Err(rejected_transition(order_id, OrderTransition::Fail, OrderScope::Any, &mut tx).await),
            },
        }
    }

    async fn ship_order(
        &self,
        merchant_id: i64,
        order_id: OrderId,
        tracking_number: Option<String>,
    ) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let scope = OrderScope::Merchant(merchant_id);
        let tracking = tracking_number.as_deref();
        let order = match orders::transition_order(order_id, OrderTransition::Ship, scope, tracking, &mut tx).await? {
            Some(order) => order,
            None => return Err(rejected_transition(order_id, OrderTransition::Ship, scope, &mut tx).await),
        };
        tx.commit().await?;
        debug!("🗃️ Order {order_id} shipped by merchant #{merchant_id}");
        Ok(order)
    }

    async fn complete_order(&self, buyer_id: i64, order_id: OrderId) -> Result<LedgerMovement, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let scope = OrderScope::Buyer(buyer_id);
        let order = match orders::transition_order(order_id, OrderTransition::Complete, scope, None, &mut tx).await? {
            Some(order) => order,
            None => return Err(rejected_transition(order_id, OrderTransition::Complete, scope, &mut tx).await),
        };
        let wallet = wallets::fetch_or_create_wallet(order.merchant_id, &mut tx).await?;
        let wallet = wallets::apply(wallet.id, LedgerPrimitive::Release(order.id), order.total_amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} completed by buyer #{buyer_id}. {} released", order.total_amount);
        Ok(LedgerMovement { order, wallet })
    }

    async fn open_dispute(
        &self,
        buyer_id: i64,
        order_id: OrderId,
        reason: &str,
    ) -> Result<Dispute, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        if let Some(dispute) = disputes::insert_dispute(order_id, buyer_id, reason, &mut tx).await? {
            tx.commit().await?;
            debug!("🗃️ Dispute #{} opened on order {order_id} by buyer #{buyer_id}", dispute.id);
            return Ok(dispute);
        }
        let scope = OrderScope::Buyer(buyer_id);
        let order = orders::fetch_scoped_order(order_id, scope, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::OrderNotFound(order_id))?;
        match OrderTransition::Refund.check(&order) {
            Err(e) => Err(PaymentGatewayError::PreconditionFailed(format!("A dispute cannot be opened. {e}"))),
            Ok(_) => Err(PaymentGatewayError::DisputeAlreadyExists(order_id)),
        }
    }

    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        decision: DisputeDecision,
    ) -> Result<(Dispute, LedgerMovement), PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let dispute = match disputes::mark_resolved(dispute_id, decision, &mut tx).await? {
            Some(d) => d,
            None => {
                return match disputes::fetch_dispute(dispute_id, &mut tx).await? {
                    Some(_) => Err(PaymentGatewayError::DisputeAlreadyResolved(dispute_id)),
                    None => Err(PaymentGatewayError::DisputeNotFound(dispute_id)),
                };
            },
        };
        let order_id = dispute.order_id;
        let before =
            orders::fetch_order(order_id, &mut tx).await?.ok_or(PaymentGatewayError::OrderNotFound(order_id))?;
        let (transition, primitive) = match decision {
            DisputeDecision::Refund if before.order_status == OrderStatusType::Completed => {
                (OrderTransition::Refund, LedgerPrimitive::RefundReleased(order_id))
            },
            DisputeDecision::Refund => (OrderTransition::Refund, LedgerPrimitive::Refund(order_id)),
            DisputeDecision::Release => (OrderTransition::Release, LedgerPrimitive::Release(order_id)),
        };
        let order = match orders::transition_order(order_id, transition, OrderScope::Any, None, &mut tx).await? {
            Some(order) => order,
            None => return Err(rejected_transition(order_id, transition, OrderScope::Any, &mut tx).await),
        };
        let wallet = wallets::fetch_or_create_wallet(order.merchant_id, &mut tx).await?;
        let wallet = wallets::apply(wallet.id, primitive, order.total_amount, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Dispute #{dispute_id} resolved ({decision}). Order {order_id} is now {}", order.order_status);
        Ok((dispute, LedgerMovement { order, wallet }))
    }

    async fn request_withdrawal(
        &self,
        merchant_id: i64,
        withdrawal: NewWithdrawal,
    ) -> Result<(WithdrawRequest, Wallet), PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::fetch_or_create_wallet(merchant_id, &mut tx).await?;
        let amount = withdrawal.amount;
        let request = withdrawals::insert_withdrawal(merchant_id, withdrawal, &mut tx).await?;
        let wallet = wallets::apply(wallet.id, LedgerPrimitive::ReserveForPayout(request.id), amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Withdrawal request #{} for {amount} reserved from wallet #{}", request.id, wallet.id);
        Ok((request, wallet))
    }

    async fn insert_audit_log(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let entry = audit_log::insert_audit_log(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders(&self, ids: &[OrderId]) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_by_ids(ids, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_buyer(buyer_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders_for_merchant(&self, merchant_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_merchant(merchant_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_order_status_log(&self, order_id: OrderId) -> Result<Vec<OrderStatusLog>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let log = orders::fetch_status_log(order_id, &mut conn).await?;
        Ok(log)
    }

    async fn fetch_payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_merchant(&self, merchant_id: i64) -> Result<Option<Merchant>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_merchant(merchant_id, &mut conn).await?;
        Ok(merchant)
    }

    async fn fetch_merchant_for_user(&self, user_id: i64) -> Result<Option<Merchant>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_merchant_for_user(user_id, &mut conn).await?;
        Ok(merchant)
    }

    async fn fetch_pending_merchants(&self) -> Result<Vec<Merchant>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let merchants = merchants::fetch_pending_merchants(&mut conn).await?;
        Ok(merchants)
    }

    async fn fetch_wallet_for_merchant(&self, merchant_id: i64) -> Result<Option<Wallet>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet_for_merchant(merchant_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_wallet_transactions(&self, wallet_id: i64) -> Result<Vec<WalletTransaction>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let txs = wallets::fetch_wallet_transactions(wallet_id, &mut conn).await?;
        Ok(txs)
    }

    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let dispute = disputes::fetch_dispute(dispute_id, &mut conn).await?;
        Ok(dispute)
    }

    async fn fetch_open_disputes(&self) -> Result<Vec<Dispute>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let disputes = disputes::fetch_open_disputes(&mut conn).await?;
        Ok(disputes)
    }

    async fn fetch_withdrawals_for_merchant(&self, merchant_id: i64) -> Result<Vec<WithdrawRequest>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let requests = withdrawals::fetch_withdrawals_for_merchant(merchant_id, &mut conn).await?;
        Ok(requests)
    }

    async fn fetch_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit_log::fetch_audit_logs(limit, &mut conn).await?;
        Ok(entries)
    }
}
