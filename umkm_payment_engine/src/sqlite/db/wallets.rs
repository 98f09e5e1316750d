//! Ledger store primitives.
//!
//! Every balance movement goes through [`apply`], which performs a single guarded `UPDATE` followed by the matching
//! ledger entry. The guard lives in the `WHERE` clause, so the balance check and the write are one statement and two
//! concurrent debits on the same wallet can never both succeed against a stale balance.
use std::fmt::Display;

use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{LedgerEntryKind, OrderId, Rupiah, TransactionType, Wallet, WalletTransaction},
    traits::PaymentGatewayError,
};

/// The balance movements the ledger supports. Each one knows its effect on both balances and the ledger entry it
/// produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPrimitive {
    /// Order paid: `pending += amount`, `IN`
    CreditPending(OrderId),
    /// Order completed, or dispute released: `pending -= amount; available += amount`, `IN`
    Release(OrderId),
    /// Dispute refunded while the funds are in escrow: `pending -= amount`, `OUT`
    Refund(OrderId),
    /// Dispute refunded after the escrow was already released: `available -= amount`, `OUT`
    RefundReleased(OrderId),
    /// Withdrawal requested: `available -= amount; pending += amount`, `OUT`. Carries the withdrawal request id.
    ReserveForPayout(i64),
}

impl LedgerPrimitive {
    pub fn kind(&self) -> LedgerEntryKind {
        match self {
            LedgerPrimitive::CreditPending(_) => LedgerEntryKind::CreditPending,
            LedgerPrimitive::Release(_) => LedgerEntryKind::Release,
            LedgerPrimitive::Refund(_) => LedgerEntryKind::Refund,
            LedgerPrimitive::RefundReleased(_) => LedgerEntryKind::RefundReleased,
            LedgerPrimitive::ReserveForPayout(_) => LedgerEntryKind::ReserveForPayout,
        }
    }

    /// Returns `(pending delta, available delta)` for the given amount.
    pub fn deltas(&self, amount: Rupiah) -> (Rupiah, Rupiah) {
        self.kind().deltas(amount)
    }

    pub fn tx_type(&self) -> TransactionType {
        self.kind().tx_type()
    }

    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            LedgerPrimitive::CreditPending(id)
            | LedgerPrimitive::Release(id)
            | LedgerPrimitive::Refund(id)
            | LedgerPrimitive::RefundReleased(id) => Some(*id),
            LedgerPrimitive::ReserveForPayout(_) => None,
        }
    }
}

impl Display for LedgerPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerPrimitive::CreditPending(id) => write!(f, "Payment for order {id}"),
            LedgerPrimitive::Release(id) => write!(f, "Release for order {id}"),
            LedgerPrimitive::Refund(id) => write!(f, "Refund for order {id}"),
            LedgerPrimitive::RefundReleased(id) => write!(f, "Refund (after release) for order {id}"),
            LedgerPrimitive::ReserveForPayout(id) => write!(f, "Withdrawal request #{id}"),
        }
    }
}

/// Fetches the merchant's wallet, creating an empty one if it does not exist yet. This is the only place wallets are
/// created.
pub async fn fetch_or_create_wallet(merchant_id: i64, conn: &mut SqliteConnection) -> Result<Wallet, sqlx::Error> {
    let inserted = sqlx::query("INSERT INTO wallets (merchant_id) VALUES ($1) ON CONFLICT(merchant_id) DO NOTHING")
        .bind(merchant_id)
        .execute(&mut *conn)
        .await?;
    if inserted.rows_affected() > 0 {
        debug!("👛️ Created wallet for merchant #{merchant_id}");
    }
    let wallet =
        sqlx::query_as("SELECT * FROM wallets WHERE merchant_id = $1").bind(merchant_id).fetch_one(conn).await?;
    Ok(wallet)
}

pub async fn fetch_wallet_for_merchant(
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallets WHERE merchant_id = $1").bind(merchant_id).fetch_optional(conn).await
}

pub async fn fetch_wallet_transactions(
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallet_transactions WHERE wallet_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(wallet_id)
        .fetch_all(conn)
        .await
}

/// Applies a ledger primitive to the wallet and appends its ledger entry. This is not atomic by itself: call it on a
/// transaction (`&mut *tx`) so the balance update and the ledger entry commit or roll back together.
///
/// Fails with [`PaymentGatewayError::InsufficientBalance`] (and changes nothing) if either balance would go negative.
pub async fn apply(
    wallet_id: i64,
    primitive: LedgerPrimitive,
    amount: Rupiah,
    conn: &mut SqliteConnection,
) -> Result<Wallet, PaymentGatewayError> {
    if !amount.is_positive() {
        return Err(PaymentGatewayError::PreconditionFailed(format!("{primitive}: amount must be positive")));
    }
    let (pending, available) = primitive.deltas(amount);
    let wallet: Option<Wallet> = sqlx::query_as(
        r#"
        UPDATE wallets SET
            balance_pending = balance_pending + $1,
            balance_available = balance_available + $2,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $3 AND balance_pending + $1 >= 0 AND balance_available + $2 >= 0
        RETURNING *
        "#,
    )
    .bind(pending)
    .bind(available)
    .bind(wallet_id)
    .fetch_optional(&mut *conn)
    .await?;
    let wallet = wallet.ok_or(PaymentGatewayError::InsufficientBalance { wallet_id, required: amount })?;
    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (wallet_id, type, kind, amount, description, order_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(wallet_id)
    .bind(primitive.tx_type())
    .bind(primitive.kind())
    .bind(amount)
    .bind(primitive.to_string())
    .bind(primitive.order_id())
    .execute(conn)
    .await?;
    trace!(
        "👛️ {primitive}: {amount} applied to wallet #{wallet_id}. Pending {}, available {}",
        wallet.balance_pending,
        wallet.balance_available
    );
    Ok(wallet)
}
