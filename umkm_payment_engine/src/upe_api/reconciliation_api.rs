use std::fmt::Debug;

use log::*;
use umkm_common::{Rupiah, Secret};

use crate::{
    events::{EventProducers, OrderPaidEvent},
    helpers::verify_callback_signature,
    traits::{OrderPaymentOutcome, PaymentGatewayDatabase, PaymentGatewayError},
    upe_api::callback_objects::{
        GatewayCallback,
        GatewayOutcome,
        OrderFailure,
        OrderIdList,
        ReconciliationReport,
    },
};

/// `ReconciliationApi` turns gateway payment notifications into order and wallet updates.
///
/// Gateways deliver notifications at least once, possibly concurrently and out of order, and resend them on timeout.
/// Processing is therefore idempotent per order: each order covered by a callback is applied in its own database
/// transaction, and an order that has already been settled is skipped. A failure on one order never prevents the
/// others from being processed.
pub struct ReconciliationApi<B> {
    db: B,
    producers: EventProducers,
    server_key: Secret<String>,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, producers: EventProducers, server_key: Secret<String>) -> Self {
        Self { db, producers, server_key }
    }
}

impl<B> ReconciliationApi<B>
where B: PaymentGatewayDatabase
{
    /// Processes a single gateway callback.
    ///
    /// 1. The signature is verified. A mismatch fails with [`PaymentGatewayError::InvalidSignature`] before anything
    ///    else is looked at.
    /// 2. The transaction status is mapped to an outcome. `Pending` outcomes are acknowledged and nothing is applied.
    /// 3. `custom_field1` is parsed into an [`OrderIdList`]. Unparsable data fails with `MalformedOrderIds`; an empty
    ///    list, or a list where none of the orders exist, fails with `NoMatchingOrders`.
    /// 4. Every listed order is settled (or failed) independently.
    ///
    /// Per-order problems are collected in the returned report rather than returned as an error.
    pub async fn process_callback(
        &self,
        callback: &GatewayCallback,
    ) -> Result<ReconciliationReport, PaymentGatewayError> {
        let trx = callback.order_id.as_str();
        if !verify_callback_signature(
            trx,
            &callback.status_code,
            &callback.gross_amount,
            self.server_key.reveal(),
            &callback.signature_key,
        ) {
            warn!("🔄️🔐️ Invalid signature on callback for transaction {trx}");
            return Err(PaymentGatewayError::InvalidSignature);
        }
        let outcome = GatewayOutcome::from_status(&callback.transaction_status, callback.fraud_status.as_deref());
        let mut report = ReconciliationReport::new(trx, outcome);
        if outcome == GatewayOutcome::Pending {
            info!("🔄️ Transaction {trx} is '{}'. Acknowledged without changes", callback.transaction_status);
            return Ok(report);
        }
        let ids = callback.custom_field1.as_deref().unwrap_or_default().parse::<OrderIdList>()?;
        if ids.is_empty() {
            warn!("🔄️ Transaction {trx} does not list any orders");
            return Err(PaymentGatewayError::NoMatchingOrders);
        }
        let existing = self.db.fetch_orders(ids.ids()).await?;
        if existing.is_empty() {
            warn!("🔄️ None of the {} orders listed in transaction {trx} exist", ids.len());
            return Err(PaymentGatewayError::NoMatchingOrders);
        }
        self.check_gross_amount(callback, existing.iter().map(|o| o.total_amount).sum());

        for &order_id in ids.ids() {
            let result = match outcome {
                GatewayOutcome::Paid => self.db.apply_settlement(order_id, trx).await,
                _ => self.db.apply_payment_failure(order_id).await,
            };
            match result {
                Ok(applied) => {
                    if let OrderPaymentOutcome::Credited { order, .. } = &applied {
                        self.producers.publish_order_paid(OrderPaidEvent::new(order.clone())).await;
                    }
                    report.applied.push(applied);
                },
                Err(PaymentGatewayError::OrderNotFound(id)) => {
                    warn!("🔄️ Order {id} in transaction {trx} does not exist. Skipping");
                    report.missing.push(id);
                },
                Err(error) => {
                    error!("🔄️ Could not apply {outcome} outcome of transaction {trx} to order {order_id}: {error}");
                    report.failures.push(OrderFailure { order_id, error });
                },
            }
        }
        info!(
            "🔄️ Transaction {trx} ({outcome}) processed. {} applied, {} credited, {} missing, {} failed",
            report.applied.len(),
            report.credited(),
            report.missing.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// The gross amount is signed by the gateway but covers the whole checkout. A mismatch with the order totals is
    /// only logged.
    fn check_gross_amount(&self, callback: &GatewayCallback, expected: Rupiah) {
        match callback.gross_amount.parse::<Rupiah>() {
            Ok(gross) if gross != expected => warn!(
                "🔄️ Transaction {} reports a gross amount of {gross}, but the listed orders total {expected}",
                callback.order_id
            ),
            Ok(_) => {},
            Err(e) => warn!("🔄️ Transaction {} has an unreadable gross amount. {e}", callback.order_id),
        }
    }
}
