//! UMKM Payment Engine
//!
//! The payment engine is the escrow ledger behind the UMKM marketplace. Buyers pay through the payment gateway, the
//! funds are held in escrow in the merchant's pending balance, and are released to the available balance once the
//! buyer confirms receipt or an admin resolves a dispute in the merchant's favour.
//!
//! The library is divided into three main sections:
//! 1. The data types ([`mod@db_types`]) and the order state machine ([`mod@order_state`]).
//! 2. Database backends ([`mod@sqlite`]). Backends implement the traits in [`mod@traits`]. Every mutating trait method
//!    is one atomic unit of work.
//! 3. The public API ([`mod@upe_api`]). You should never need to access the database directly for writes.
//!
//! The engine also emits events after units of work commit. See [`mod@events`].

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_state;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
pub mod upe_api;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AccountApiError,
    AccountManagement,
    LedgerMovement,
    OrderPaymentOutcome,
    PaymentGatewayDatabase,
    PaymentGatewayError,
};
#[cfg(feature = "sqlite")]
pub use upe_api::audit_sink::sqlite_audit_sink;
pub use upe_api::{
    accounts_api::{AccountApi, OrderDetails, WalletHistory},
    callback_objects::{GatewayCallback, GatewayOutcome, OrderIdList, ReconciliationReport},
    dispute_api::DisputeApi,
    merchant_api::MerchantApi,
    order_flow_api::OrderFlowApi,
    reconciliation_api::ReconciliationApi,
    withdrawal_api::{WithdrawalApi, DEFAULT_MINIMUM_WITHDRAWAL},
};
