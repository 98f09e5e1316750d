use sqlx::SqliteConnection;

use crate::db_types::{NewWithdrawal, WithdrawRequest};

pub async fn insert_withdrawal(
    merchant_id: i64,
    withdrawal: NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<WithdrawRequest, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO withdraw_requests (merchant_id, amount, bank_name, bank_account)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(merchant_id)
    .bind(withdrawal.amount)
    .bind(withdrawal.bank_name)
    .bind(withdrawal.bank_account)
    .fetch_one(conn)
    .await
}

pub async fn fetch_withdrawals_for_merchant(
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WithdrawRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM withdraw_requests WHERE merchant_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(merchant_id)
        .fetch_all(conn)
        .await
}
