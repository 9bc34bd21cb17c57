//! Core types and shared functionality for havn.
//!
//! This crate provides:
//! - The versioned cache store and its SQLite backend
//! - The fallback resource set
//! - Unified error types
//! - Configuration structures

pub mod assets;
pub mod cache;
pub mod config;
pub mod error;

pub use assets::FallbackSet;
pub use cache::{CacheDb, CacheEntry, CacheStore, CachedResponse, MatchOptions, RequestKey};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
