//! # UMKM payment engine public API
//!
//! The `upe_api` module exposes the programmatic API for the escrow ledger. Each API is a thin layer over a database
//! backend that validates input, delegates the atomic unit of work to the backend, and publishes events once the unit
//! has committed.
//!
//! * [`reconciliation_api`] turns gateway payment callbacks into order and wallet updates.
//! * [`order_flow_api`] handles shipping, buyer confirmation and opening disputes.
//! * [`dispute_api`] applies admin decisions to disputes.
//! * [`withdrawal_api`] reserves merchant funds for payout.
//! * [`merchant_api`] approves and rejects merchant registrations.
//! * [`accounts_api`] provides the read models.
//!
//! # API usage
//!
//! ```rust,ignore
//! use umkm_payment_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/umkm_store.db", 25).await?;
//! let api = AccountApi::new(db);
//! let wallet = api.wallet_history(merchant_id).await?;
//! ```

pub mod accounts_api;
#[cfg(feature = "sqlite")]
pub mod audit_sink;
pub mod callback_objects;
pub mod dispute_api;
pub mod merchant_api;
pub mod order_flow_api;
pub mod reconciliation_api;
pub mod withdrawal_api;
