use thiserror::Error;

use crate::{
    db_types::{
        AuditLogEntry,
        Dispute,
        DisputeDecision,
        Merchant,
        NewAuditLogEntry,
        NewMerchant,
        NewOrder,
        NewWithdrawal,
        Order,
        OrderId,
        Rupiah,
        Wallet,
        WithdrawRequest,
    },
    order_state::TransitionError,
    traits::{data_objects::LedgerMovement, AccountApiError, AccountManagement, OrderPaymentOutcome},
};

/// This trait defines the highest level of behaviour for backends supporting the escrow ledger.
///
/// Every method is one atomic unit of work. Balance updates are always paired with exactly one ledger entry in the
/// same database transaction, and a debit that would take a balance below zero fails the whole unit with
/// [`PaymentGatewayError::InsufficientBalance`].
///
/// Wallets are fetched or created through a single backend primitive, so any flow that needs the merchant's wallet
/// may rely on it existing.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + AccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Registers a new merchant profile in `Pending` status.
    async fn insert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, PaymentGatewayError>;

    /// Approves a `Pending` merchant. The status change and the creation of the merchant's wallet happen in the same
    /// transaction, so an active merchant always has a wallet.
    async fn approve_merchant(&self, merchant_id: i64) -> Result<(Merchant, Wallet), PaymentGatewayError>;

    /// Rejects a `Pending` merchant.
    async fn reject_merchant(&self, merchant_id: i64, reason: &str) -> Result<Merchant, PaymentGatewayError>;

    /// Stores a new, unpaid order.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;

    /// Applies a gateway settlement to a single order. In one transaction:
    /// * If the order is already paid, nothing is changed and `AlreadyPaid` is returned.
    /// * The order is marked `Paid` / `Pending`.
    /// * A payment row is inserted. The unique constraint on the payment's order reference is the authoritative guard
    ///   against double credits. If a payment already exists, only the status write is committed
    ///   (`PaymentAlreadyRecorded`).
    /// * Otherwise the merchant's pending balance is credited with the order total and an `IN` ledger entry is
    ///   appended (`Credited`).
    async fn apply_settlement(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<OrderPaymentOutcome, PaymentGatewayError>;

    /// Applies a denied, cancelled or expired gateway outcome to a single order. Orders that are already paid are left
    /// untouched (`AlreadyPaid`). Otherwise the order is marked `Failed` / `Cancelled`. No wallet is touched.
    async fn apply_payment_failure(&self, order_id: OrderId) -> Result<OrderPaymentOutcome, PaymentGatewayError>;

    /// The merchant ships a paid order, optionally setting the tracking number. A shipped order may be shipped again
    /// to update the tracking number. Orders belonging to other merchants are reported as not found.
    async fn ship_order(
        &self,
        merchant_id: i64,
        order_id: OrderId,
        tracking_number: Option<String>,
    ) -> Result<Order, PaymentGatewayError>;

    /// The buyer confirms receipt of a shipped order. The order becomes `Completed` and its total is released from the
    /// merchant's pending balance into the available balance, all in one transaction.
    async fn complete_order(&self, buyer_id: i64, order_id: OrderId) -> Result<LedgerMovement, PaymentGatewayError>;

    /// The buyer opens a dispute on one of their paid orders. At most one dispute exists per order.
    async fn open_dispute(
        &self,
        buyer_id: i64,
        order_id: OrderId,
        reason: &str,
    ) -> Result<Dispute, PaymentGatewayError>;

    /// Resolves an open dispute. In one transaction the dispute is marked resolved with the decision, the order
    /// transitions (`Refunded` or `Completed`), and the matching ledger primitive is applied. A dispute can only be
    /// resolved once.
    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        decision: DisputeDecision,
    ) -> Result<(Dispute, LedgerMovement), PaymentGatewayError>;

    /// Inserts a `Pending` withdrawal request and moves `amount` from the available balance into the pending balance,
    /// in one transaction.
    async fn request_withdrawal(
        &self,
        merchant_id: i64,
        withdrawal: NewWithdrawal,
    ) -> Result<(WithdrawRequest, Wallet), PaymentGatewayError>;

    async fn insert_audit_log(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
    #[error("The callback signature is invalid.")]
    InvalidSignature,
    #[error("The order id list in the callback could not be parsed. {0}")]
    MalformedOrderIds(String),
    #[error("The callback does not refer to any known orders")]
    NoMatchingOrders,
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested dispute #{0} does not exist")]
    DisputeNotFound(i64),
    #[error("The requested merchant #{0} does not exist")]
    MerchantNotFound(i64),
    #[error("{0}")]
    InvalidTransition(#[from] TransitionError),
    #[error("Precondition failed. {0}")]
    PreconditionFailed(String),
    #[error("Insufficient balance in wallet #{wallet_id}. {required} is required")]
    InsufficientBalance { wallet_id: i64, required: Rupiah },
    #[error("Withdrawal of {requested} is below the minimum of {minimum}")]
    BelowMinimumWithdrawal { requested: Rupiah, minimum: Rupiah },
    #[error("Dispute #{0} has already been resolved")]
    DisputeAlreadyResolved(i64),
    #[error("A dispute already exists for order {0}")]
    DisputeAlreadyExists(OrderId),
    #[error("Invalid dispute decision: {0}. Expected REFUND or RELEASE")]
    InvalidDecision(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}

impl PaymentGatewayError {
    /// True for failures of the storage layer itself, as opposed to business-rule rejections. A unit of work that
    /// failed this way may succeed when retried.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PaymentGatewayError::DatabaseError(_) | PaymentGatewayError::AccountError(AccountApiError::DatabaseError(_))
        )
    }
}
