use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Merchant, MerchantStatus, NewMerchant};

pub async fn insert_merchant(merchant: NewMerchant, conn: &mut SqliteConnection) -> Result<Merchant, sqlx::Error> {
    let merchant: Merchant =
        sqlx::query_as("INSERT INTO merchants (user_id, store_name, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(merchant.user_id)
            .bind(merchant.store_name)
            .bind(merchant.slug)
            .fetch_one(conn)
            .await?;
    debug!("🏪️ Merchant #{} ({}) registered for user #{}", merchant.id, merchant.store_name, merchant.user_id);
    Ok(merchant)
}

pub async fn fetch_merchant(id: i64, conn: &mut SqliteConnection) -> Result<Option<Merchant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM merchants WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_merchant_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM merchants WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_pending_merchants(conn: &mut SqliteConnection) -> Result<Vec<Merchant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM merchants WHERE status = 'PENDING' ORDER BY created_at ASC, id ASC")
        .fetch_all(conn)
        .await
}

/// Moves a `Pending` merchant to `new_status`. Returns `None` if the merchant does not exist or is no longer pending.
pub async fn decide_pending_merchant(
    id: i64,
    new_status: MerchantStatus,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE merchants SET status = $1, rejection_reason = $2, updated_at = CURRENT_TIMESTAMP
        WHERE id = $3 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(new_status)
    .bind(reason)
    .bind(id)
    .fetch_optional(conn)
    .await
}
