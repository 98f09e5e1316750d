//! # Order state machine
//!
//! An order carries two independently stored axes: the payment axis ([`PaymentStatus`]) and the fulfillment axis
//! ([`OrderStatusType`]). Fulfillment transitions are gated by the payment axis:
//!
//! ```text
//!   payment:      UNPAID ──► PAID
//!                   └──────► FAILED
//!
//!   fulfillment:  PENDING ──► SHIPPED ──► COMPLETED
//!                   │  └───────┴────────────┴──► REFUNDED   (dispute override)
//!                   └──► CANCELLED
//! ```
//!
//! Backends use [`OrderTransition::source_states`] to build guarded `UPDATE` statements, and
//! [`OrderTransition::check`] to explain why a guarded update matched no rows.
use std::fmt::Display;

use thiserror::Error;

use crate::db_types::{Order, OrderStatusType, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTransition {
    /// The gateway settled the payment.
    Pay,
    /// The gateway denied, cancelled or expired the payment.
    Fail,
    /// The merchant ships the order, or updates the tracking number of a shipped order.
    Ship,
    /// The buyer confirms receipt.
    Complete,
    /// Admin dispute decision: refund the buyer.
    Refund,
    /// Admin dispute decision: release the escrow to the merchant.
    Release,
}

impl Display for OrderTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderTransition::Pay => write!(f, "pay"),
            OrderTransition::Fail => write!(f, "fail"),
            OrderTransition::Ship => write!(f, "ship"),
            OrderTransition::Complete => write!(f, "complete"),
            OrderTransition::Refund => write!(f, "refund"),
            OrderTransition::Release => write!(f, "release"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot {transition} order {order_id}: payment is {payment_status} and order is {order_status}")]
pub struct TransitionError {
    pub transition: OrderTransition,
    pub order_id: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
}

impl OrderTransition {
    /// The payment status an order must have for this transition, if any. `Pay` and `Fail` instead require that the
    /// order is *not* paid yet.
    pub fn required_payment_status(&self) -> Option<PaymentStatus> {
        match self {
            OrderTransition::Pay | OrderTransition::Fail => None,
            _ => Some(PaymentStatus::Paid),
        }
    }

    /// The fulfillment states from which this transition may start.
    pub fn source_states(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            OrderTransition::Pay => &[Pending, Cancelled],
            OrderTransition::Fail => &[Pending],
            OrderTransition::Ship => &[Pending, Shipped],
            OrderTransition::Complete => &[Shipped],
            OrderTransition::Refund => &[Pending, Shipped, Completed],
            OrderTransition::Release => &[Pending, Shipped],
        }
    }

    pub fn target(&self) -> (PaymentStatus, OrderStatusType) {
        match self {
            OrderTransition::Pay => (PaymentStatus::Paid, OrderStatusType::Pending),
            OrderTransition::Fail => (PaymentStatus::Failed, OrderStatusType::Cancelled),
            OrderTransition::Ship => (PaymentStatus::Paid, OrderStatusType::Shipped),
            OrderTransition::Complete => (PaymentStatus::Paid, OrderStatusType::Completed),
            OrderTransition::Refund => (PaymentStatus::Paid, OrderStatusType::Refunded),
            OrderTransition::Release => (PaymentStatus::Paid, OrderStatusType::Completed),
        }
    }

    /// Checks whether the transition is allowed from the order's current state, returning the new
    /// `(payment, fulfillment)` state pair if it is.
    pub fn check(&self, order: &Order) -> Result<(PaymentStatus, OrderStatusType), TransitionError> {
        let payment_ok = match self.required_payment_status() {
            Some(required) => order.payment_status == required,
            None => order.payment_status != PaymentStatus::Paid,
        };
        if payment_ok && self.source_states().contains(&order.order_status) {
            Ok(self.target())
        } else {
            Err(TransitionError {
                transition: *self,
                order_id: order.id.to_string(),
                payment_status: order.payment_status,
                order_status: order.order_status,
            })
        }
    }

    /// A SQL list literal of the source states, e.g. `('PENDING','SHIPPED')`. Only ever built from the closed enum.
    pub fn source_states_sql(&self) -> String {
        let states = self.source_states().iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        format!("({states})")
    }
}
