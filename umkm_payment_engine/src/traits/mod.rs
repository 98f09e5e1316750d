//! # Database backend contracts
//!
//! This module defines the behaviour a storage backend must provide to drive the escrow ledger.
//!
//! * [`PaymentGatewayDatabase`] holds every *mutating* flow: applying gateway outcomes to orders, shipping and
//!   completing orders, resolving disputes, reserving withdrawals and approving merchants. Each method is a single
//!   atomic unit of work. A backend must never make a partially applied flow visible.
//! * [`AccountManagement`] provides read-only queries over orders, wallets, ledger entries, disputes and the audit
//!   log.
mod account_management;
mod data_objects;
mod payment_gateway_database;

pub use account_management::{AccountApiError, AccountManagement};
pub use data_objects::{LedgerMovement, OrderPaymentOutcome};
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
