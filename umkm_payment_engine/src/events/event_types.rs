use serde::{Deserialize, Serialize};

use crate::db_types::{Dispute, NewAuditLogEntry, Order, WithdrawRequest};

/// Emitted once per order, the first time a settlement for it is applied to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeResolvedEvent {
    pub dispute: Dispute,
    pub order: Order,
}

impl DisputeResolvedEvent {
    pub fn new(dispute: Dispute, order: Order) -> Self {
        Self { dispute, order }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequestedEvent {
    pub request: WithdrawRequest,
}

/// An admin-triggered mutation, destined for the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminActionEvent {
    pub entry: NewAuditLogEntry,
}

impl AdminActionEvent {
    pub fn new(admin_id: i64, action: &str, target_type: &str, target_id: i64) -> Self {
        let entry = NewAuditLogEntry {
            admin_id,
            action: action.to_string(),
            target_type: target_type.to_string(),
            target_id,
            metadata: None,
        };
        Self { entry }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.entry.metadata = Some(metadata);
        self
    }
}
