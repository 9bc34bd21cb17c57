//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and pruning the versioned
//! SQLite cache.

pub mod delete;
pub mod get;
pub mod versions;

pub use delete::{CacheDeleteVersionParams, delete_version_impl};
pub use get::{CacheGetParams, get_impl};
pub use versions::versions_impl;
