//! SQLite-backed, versioned response cache.
//!
//! This module provides named cache stores mapping request identity
//! (method + URL) to response snapshots, using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Any number of named stores; exactly one is "current" at a time
//! - Atomic per-entry UPSERT (last write wins)
//! - Atomic whole-store deletion for version cutover
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntryMeta;
