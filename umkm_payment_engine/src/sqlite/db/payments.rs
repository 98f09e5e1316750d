use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewPayment, OrderId, Payment, PaymentStatus};

/// Inserts the payment unless one already exists for the order. Returns `None` if the payment was already recorded.
///
/// The `UNIQUE(order_id)` constraint makes this safe against concurrent inserts for the same order: exactly one of
/// them receives the new row.
pub async fn insert_payment_if_absent(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let inserted: Option<Payment> = sqlx::query_as(
        r#"
        INSERT INTO payments (order_id, transaction_id, method, amount, status)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT(order_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.transaction_id)
    .bind(payment.method)
    .bind(payment.amount)
    .bind(PaymentStatus::Paid)
    .fetch_optional(conn)
    .await?;
    match &inserted {
        Some(p) => debug!("💰️ Payment #{} recorded for order {} ({})", p.id, p.order_id, p.amount),
        None => debug!("💰️ A payment for order {} already exists", payment.order_id),
    }
    Ok(inserted)
}

pub async fn fetch_payment_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1").bind(order_id).fetch_optional(conn).await
}
