//! # UMKM payment server
//! The HTTP front of the escrow ledger. It is responsible for:
//! * Receiving payment notifications from Midtrans and reconciling them against orders and merchant wallets.
//! * The order lifecycle endpoints for buyers and merchants (ship, track, complete, dispute).
//! * Merchant wallet and withdrawal endpoints.
//! * The admin endpoints for disputes, merchant approval and the audit log.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/midtrans/callback`: Payment notifications. Authenticated by signature and an optional IP whitelist.
//! * `/api/...`: Everything else. Requires a bearer token. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;
