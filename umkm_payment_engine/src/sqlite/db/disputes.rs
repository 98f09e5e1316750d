use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Dispute, DisputeDecision, OrderId},
    order_state::OrderTransition,
};

/// Opens a dispute on behalf of the buyer. The eligibility check and the insert are one statement: the order must
/// belong to the buyer, be paid, and be in one of the refundable states.
///
/// Returns `None` if the order is not eligible or already has a dispute.
pub async fn insert_dispute(
    order_id: OrderId,
    buyer_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Dispute>, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO disputes (order_id, reason)
        SELECT id, $1 FROM orders
        WHERE id = $2 AND buyer_id = $3 AND payment_status = 'PAID' AND order_status IN {}
        ON CONFLICT(order_id) DO NOTHING
        RETURNING *
        "#,
        OrderTransition::Refund.source_states_sql()
    );
    let dispute: Option<Dispute> =
        sqlx::query_as(&sql).bind(reason).bind(order_id).bind(buyer_id).fetch_optional(conn).await?;
    if let Some(d) = &dispute {
        debug!("⚖️ Dispute #{} opened for order {order_id}", d.id);
    }
    Ok(dispute)
}

pub async fn fetch_dispute(id: i64, conn: &mut SqliteConnection) -> Result<Option<Dispute>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM disputes WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_open_disputes(conn: &mut SqliteConnection) -> Result<Vec<Dispute>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM disputes WHERE status = 'OPEN' ORDER BY created_at ASC, id ASC").fetch_all(conn).await
}

/// Marks the dispute resolved, but only if it is still open. Returns `None` if the dispute does not exist or was
/// already resolved.
pub async fn mark_resolved(
    id: i64,
    decision: DisputeDecision,
    conn: &mut SqliteConnection,
) -> Result<Option<Dispute>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE disputes SET status = 'RESOLVED', decision = $1, resolved_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'OPEN'
        RETURNING *
        "#,
    )
    .bind(decision)
    .bind(id)
    .fetch_optional(conn)
    .await
}
