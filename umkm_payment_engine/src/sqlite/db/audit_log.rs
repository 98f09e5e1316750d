use sqlx::SqliteConnection;

use crate::db_types::{AuditLogEntry, NewAuditLogEntry};

pub async fn insert_audit_log(
    entry: NewAuditLogEntry,
    conn: &mut SqliteConnection,
) -> Result<AuditLogEntry, sqlx::Error> {
    let metadata = entry.metadata.map(|m| m.to_string());
    sqlx::query_as(
        r#"
        INSERT INTO audit_logs (admin_id, action, target_type, target_id, metadata)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(entry.admin_id)
    .bind(entry.action)
    .bind(entry.target_type)
    .bind(entry.target_id)
    .bind(metadata)
    .fetch_one(conn)
    .await
}

pub async fn fetch_audit_logs(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM audit_logs ORDER BY created_at DESC, id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await
}
