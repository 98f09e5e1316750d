use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Dispute, Order, OrderId},
    events::EventProducers,
    traits::{LedgerMovement, PaymentGatewayDatabase, PaymentGatewayError},
};

/// `OrderFlowApi` drives the fulfillment side of the order state machine: shipping, tracking updates, buyer
/// confirmation (which releases the escrow), and opening disputes.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// The merchant marks a paid order as shipped. Fails with `InvalidTransition` if the order is not paid, and with
    /// `OrderNotFound` if it does not belong to the merchant.
    pub async fn ship_order(
        &self,
        merchant_id: i64,
        order_id: OrderId,
        tracking_number: Option<&str>,
    ) -> Result<Order, PaymentGatewayError> {
        let tracking = tracking_number.map(str::trim).filter(|t| !t.is_empty()).map(String::from);
        let order = self.db.ship_order(merchant_id, order_id, tracking).await?;
        info!("🔄️📦️ Order {order_id} shipped by merchant #{merchant_id}");
        Ok(order)
    }

    /// Sets the tracking number of a paid order, marking it shipped if it was not already.
    pub async fn update_tracking(
        &self,
        merchant_id: i64,
        order_id: OrderId,
        tracking_number: &str,
    ) -> Result<Order, PaymentGatewayError> {
        let tracking = tracking_number.trim();
        if tracking.is_empty() {
            return Err(PaymentGatewayError::PreconditionFailed("A tracking number is required".to_string()));
        }
        let order = self.db.ship_order(merchant_id, order_id, Some(tracking.to_string())).await?;
        debug!("🔄️📦️ Tracking number for order {order_id} set to {tracking}");
        Ok(order)
    }

    /// The buyer confirms receipt. The escrowed order total moves from the merchant's pending balance to the available
    /// balance.
    pub async fn complete_order(
        &self,
        buyer_id: i64,
        order_id: OrderId,
    ) -> Result<LedgerMovement, PaymentGatewayError> {
        let movement = self.db.complete_order(buyer_id, order_id).await?;
        info!(
            "🔄️✅️ Order {order_id} completed. {} released to wallet #{}",
            movement.order.total_amount, movement.wallet.id
        );
        Ok(movement)
    }

    pub async fn open_dispute(
        &self,
        buyer_id: i64,
        order_id: OrderId,
        reason: &str,
    ) -> Result<Dispute, PaymentGatewayError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PaymentGatewayError::PreconditionFailed("A dispute needs a reason".to_string()));
        }
        let dispute = self.db.open_dispute(buyer_id, order_id, reason).await?;
        info!("🔄️⚖️ Dispute #{} opened on order {order_id}", dispute.id);
        Ok(dispute)
    }
}
