use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment, Wallet};

/// The result of applying a gateway outcome to a single order.
///
/// Only `Credited` moves money. The other variants are normal, successful outcomes of an idempotent apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderPaymentOutcome {
    /// The order was marked paid, the payment recorded, and the merchant's pending balance credited.
    Credited { order: Order, payment: Payment, wallet: Wallet },
    /// The order status was written, but a payment for this order already existed, so no credit was applied.
    PaymentAlreadyRecorded(Order),
    /// The order was already paid. Nothing was changed.
    AlreadyPaid(Order),
    /// The order was marked failed and cancelled.
    MarkedFailed(Order),
    /// The order had already failed. Nothing was changed.
    AlreadyFailed(Order),
}

impl OrderPaymentOutcome {
    pub fn order(&self) -> &Order {
        match self {
            OrderPaymentOutcome::Credited { order, .. } => order,
            OrderPaymentOutcome::PaymentAlreadyRecorded(order) => order,
            OrderPaymentOutcome::AlreadyPaid(order) => order,
            OrderPaymentOutcome::MarkedFailed(order) => order,
            OrderPaymentOutcome::AlreadyFailed(order) => order,
        }
    }

    pub fn is_credit(&self) -> bool {
        matches!(self, OrderPaymentOutcome::Credited { .. })
    }
}

/// The effect of a buyer completing an order, or an admin resolving a dispute, on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerMovement {
    pub order: Order,
    pub wallet: Wallet,
}
