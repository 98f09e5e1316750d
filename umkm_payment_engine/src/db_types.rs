use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use umkm_common::Rupiah;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// A buyer
    User,
    /// A merchant (UMKM) account
    Umkm,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Umkm => write!(f, "UMKM"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "UMKM" => Ok(Self::Umkm),
            "ADMIN" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// The order has been created at checkout and no settlement has been received yet.
    Unpaid,
    /// The gateway reported a capture or settlement for this order.
    Paid,
    /// The gateway reported a denied, cancelled or expired transaction.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "UNPAID"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(Self::Unpaid),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// Awaiting shipment (or awaiting payment, if the payment status is still `Unpaid`).
    Pending,
    /// The merchant has shipped the order.
    Shipped,
    /// The buyer confirmed receipt, or an admin released the escrow.
    Completed,
    /// The payment failed.
    Cancelled,
    /// An admin refunded the order after a dispute.
    Refunded,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "PENDING"),
            OrderStatusType::Shipped => write!(f, "SHIPPED"),
            OrderStatusType::Completed => write!(f, "COMPLETED"),
            OrderStatusType::Cancelled => write!(f, "CANCELLED"),
            OrderStatusType::Refunded => write!(f, "REFUNDED"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SHIPPED" => Ok(Self::Shipped),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            "REFUNDED" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self).map_err(|_| ConversionError(format!("Invalid order id: {s}")))
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// The user id of the buyer
    pub buyer_id: i64,
    pub merchant_id: i64,
    pub total_amount: Rupiah,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub shipping_address: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// A single-merchant slice of a checkout. The shipping snapshot is fixed at creation.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub merchant_id: i64,
    pub total_amount: Rupiah,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub shipping_address: String,
}

impl NewOrder {
    pub fn new(buyer_id: i64, merchant_id: i64, total_amount: Rupiah) -> Self {
        Self {
            buyer_id,
            merchant_id,
            total_amount,
            receiver_name: String::default(),
            receiver_phone: String::default(),
            shipping_address: String::default(),
        }
    }

    pub fn with_shipping(mut self, name: &str, phone: &str, address: &str) -> Self {
        self.receiver_name = name.to_string();
        self.receiver_phone = phone.to_string();
        self.shipping_address = address.to_string();
        self
    }
}

//--------------------------------------    OrderStatusLog     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderStatusLog {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    /// The gateway transaction id that paid for the order
    pub transaction_id: String,
    pub method: String,
    pub amount: Rupiah,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub transaction_id: String,
    pub method: String,
    pub amount: Rupiah,
}

impl NewPayment {
    pub fn new(order_id: OrderId, transaction_id: &str, amount: Rupiah) -> Self {
        Self { order_id, transaction_id: transaction_id.to_string(), method: "midtrans".to_string(), amount }
    }
}

//--------------------------------------        Wallet         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub merchant_id: i64,
    /// Funds held in escrow, or reserved for a payout
    pub balance_pending: Rupiah,
    /// Funds the merchant may withdraw
    pub balance_available: Rupiah,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//-------------------------------------- WalletTransactionType ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::In => write!(f, "IN"),
            TransactionType::Out => write!(f, "OUT"),
        }
    }
}

//--------------------------------------    LedgerEntryKind    ---------------------------------------------------------
/// Which ledger primitive produced an entry. `IN`/`OUT` alone cannot reconstruct the balances, since a release and a
/// payout reservation move funds between the two balances of the same wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    CreditPending,
    Release,
    Refund,
    RefundReleased,
    ReserveForPayout,
}

impl LedgerEntryKind {
    /// Returns `(pending delta, available delta)` for the given amount.
    pub fn deltas(&self, amount: Rupiah) -> (Rupiah, Rupiah) {
        let zero = Rupiah::default();
        match self {
            LedgerEntryKind::CreditPending => (amount, zero),
            LedgerEntryKind::Release => (-amount, amount),
            LedgerEntryKind::Refund => (-amount, zero),
            LedgerEntryKind::RefundReleased => (zero, -amount),
            LedgerEntryKind::ReserveForPayout => (amount, -amount),
        }
    }

    pub fn tx_type(&self) -> TransactionType {
        match self {
            LedgerEntryKind::CreditPending | LedgerEntryKind::Release => TransactionType::In,
            _ => TransactionType::Out,
        }
    }
}

impl Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryKind::CreditPending => write!(f, "CREDIT_PENDING"),
            LedgerEntryKind::Release => write!(f, "RELEASE"),
            LedgerEntryKind::Refund => write!(f, "REFUND"),
            LedgerEntryKind::RefundReleased => write!(f, "REFUND_RELEASED"),
            LedgerEntryKind::ReserveForPayout => write!(f, "RESERVE_FOR_PAYOUT"),
        }
    }
}

//--------------------------------------   WalletTransaction   ---------------------------------------------------------
/// An append-only ledger entry. Every balance mutation writes exactly one of these.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: i64,
    pub wallet_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub kind: LedgerEntryKind,
    pub amount: Rupiah,
    pub description: String,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    DisputeStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DisputeStatus {
    Open,
    Resolved,
}

impl Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeStatus::Open => write!(f, "OPEN"),
            DisputeStatus::Resolved => write!(f, "RESOLVED"),
        }
    }
}

//--------------------------------------   DisputeDecision     ---------------------------------------------------------
/// The admin's decision on a dispute. Any other value is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DisputeDecision {
    /// Return the escrowed funds to the buyer. The order becomes `Refunded`.
    Refund,
    /// Pay the escrowed funds out to the merchant. The order becomes `Completed`.
    Release,
}

impl Display for DisputeDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeDecision::Refund => write!(f, "REFUND"),
            DisputeDecision::Release => write!(f, "RELEASE"),
        }
    }
}

impl FromStr for DisputeDecision {
    type Err = ConversionError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REFUND" => Ok(Self::Refund),
            "RELEASE" => Ok(Self::Release),
            _ => Err(ConversionError(format!("Invalid dispute decision: {s}"))),
        }
    }
}

//--------------------------------------       Dispute         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Dispute {
    pub id: i64,
    pub order_id: OrderId,
    pub reason: String,
    pub status: DisputeStatus,
    pub decision: Option<DisputeDecision>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

//--------------------------------------   WithdrawalStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "PENDING"),
            WithdrawalStatus::Approved => write!(f, "APPROVED"),
            WithdrawalStatus::Rejected => write!(f, "REJECTED"),
            WithdrawalStatus::Paid => write!(f, "PAID"),
        }
    }
}

//--------------------------------------   WithdrawRequest     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub id: i64,
    pub merchant_id: i64,
    pub amount: Rupiah,
    pub bank_name: String,
    pub bank_account: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWithdrawal {
    pub amount: Rupiah,
    pub bank_name: String,
    pub bank_account: String,
}

impl NewWithdrawal {
    pub fn new(amount: Rupiah, bank_name: &str, bank_account: &str) -> Self {
        Self { amount, bank_name: bank_name.to_string(), bank_account: bank_account.to_string() }
    }
}

//--------------------------------------    MerchantStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MerchantStatus {
    Pending,
    Active,
    Rejected,
}

impl Display for MerchantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MerchantStatus::Pending => write!(f, "PENDING"),
            MerchantStatus::Active => write!(f, "ACTIVE"),
            MerchantStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

//--------------------------------------       Merchant        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Merchant {
    pub id: i64,
    /// The user account that owns this store
    pub user_id: i64,
    pub store_name: String,
    pub slug: String,
    pub status: MerchantStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMerchant {
    pub user_id: i64,
    pub store_name: String,
    pub slug: String,
}

impl NewMerchant {
    pub fn new(user_id: i64, store_name: &str) -> Self {
        let slug = store_name
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        Self { user_id, store_name: store_name.to_string(), slug }
    }
}

//--------------------------------------     AuditLogEntry     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub admin_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    /// Free-form JSON metadata
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditLogEntry {
    pub admin_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub metadata: Option<serde_json::Value>,
}
