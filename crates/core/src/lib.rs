//! Core types and shared functionality for mks-sw.
//!
//! This crate provides:
//! - Versioned response cache with SQLite backend
//! - Request/response snapshot types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, EntryMeta};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{RequestDescriptor, RequestMode};
pub use response::{ResponseSnapshot, ResponseSource};
