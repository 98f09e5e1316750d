use std::fmt::Debug;

use log::*;
use serde_json::json;

use crate::{
    db_types::{Dispute, DisputeDecision},
    events::{AdminActionEvent, DisputeResolvedEvent, EventProducers},
    traits::{AccountApiError, LedgerMovement, PaymentGatewayDatabase, PaymentGatewayError},
};

/// Applies admin decisions to open disputes.
pub struct DisputeApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DisputeApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DisputeApi")
    }
}

impl<B> DisputeApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> DisputeApi<B>
where B: PaymentGatewayDatabase
{
    /// Resolves the dispute with the given decision (`REFUND` or `RELEASE`, case-insensitive).
    ///
    /// The decision is validated before anything is touched: an unknown decision fails with `InvalidDecision` and the
    /// dispute stays open.
    pub async fn resolve_dispute(
        &self,
        admin_id: i64,
        dispute_id: i64,
        decision: &str,
    ) -> Result<(Dispute, LedgerMovement), PaymentGatewayError> {
        let decision = decision
            .parse::<DisputeDecision>()
            .map_err(|_| PaymentGatewayError::InvalidDecision(decision.to_string()))?;
        let (dispute, movement) = self.db.resolve_dispute(dispute_id, decision).await?;
        info!(
            "🔄️⚖️ Admin #{admin_id} resolved dispute #{dispute_id} with {decision}. Wallet #{} now has {} pending, {} \
             available",
            movement.wallet.id, movement.wallet.balance_pending, movement.wallet.balance_available
        );
        let audit = AdminActionEvent::new(admin_id, "RESOLVE_DISPUTE", "DISPUTE", dispute_id)
            .with_metadata(json!({ "decision": decision, "order_id": dispute.order_id }));
        self.producers.publish_admin_action(audit).await;
        let event = DisputeResolvedEvent::new(dispute.clone(), movement.order.clone());
        self.producers.publish_dispute_resolved(event).await;
        Ok((dispute, movement))
    }

    pub async fn open_disputes(&self) -> Result<Vec<Dispute>, AccountApiError> {
        self.db.fetch_open_disputes().await
    }
}
