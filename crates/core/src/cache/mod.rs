//! Versioned SQLite-backed store of captured responses.
//!
//! This module provides a persistent cache partitioned by version tag, using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Normalized request identities hashed with SHA-256
//! - Whole-version atomic commits and deletion
//! - Query-insensitive lookups for asset matching
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::{MatchOptions, RequestKey};
pub use store::{CacheEntry, CacheStore, CachedResponse};
