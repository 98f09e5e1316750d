//! # SQLite Database methods
//!
//! This module contains the "low-level" SQLite interactions.
//!
//! All of these are plain functions that accept a `&mut SqliteConnection` argument. Callers obtain a connection from
//! the pool, or open a transaction and pass `&mut *tx`, so that several calls form one atomic unit of work.
//!
//! Every transaction in [`super::SqliteDatabase`] starts with a write. SQLite cannot upgrade a read lock to a write
//! lock while another writer is active, so a transaction that read first would fail with `SQLITE_BUSY` under
//! concurrent load instead of waiting for the busy timeout.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod audit_log;
pub mod disputes;
pub mod merchants;
pub mod orders;
pub mod payments;
pub mod wallets;
pub mod withdrawals;

const SQLITE_DB_URL: &str = "sqlite://data/umkm_store.db";

pub fn db_url() -> String {
    let result = env::var("UMS_DATABASE_URL").unwrap_or_else(|_| {
        info!("UMS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(10));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
