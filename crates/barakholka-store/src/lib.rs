//! # barakholka-store
//!
//! SQLite persistence for the marketplace chat core.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides the chat room resolver, the message
//! ledger, read-state tracking, favorites and the statistics aggregator.
//! Every mutating operation runs as a single transaction.

pub mod database;
pub mod directory;
pub mod favorites;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod read_state;
pub mod rooms;
pub mod statistics;

mod error;

#[cfg(test)]
mod testutil;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
