//! SQLite backend for the escrow ledger.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
