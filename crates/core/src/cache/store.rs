//! The versioned cache store contract.

use async_trait::async_trait;
use bytes::Bytes;

use super::key::{MatchOptions, RequestKey};
use crate::Error;

/// A captured response: status, headers, body.
///
/// Values are never mutated in place; an update replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A stored entry together with the key it lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub response: CachedResponse,
    pub stored_at: String,
}

/// Versioned key/value store of captured responses.
///
/// Each version tag is an isolated partition. Partitions are created whole
/// by [`CacheStore::commit_version`] and removed whole by
/// [`CacheStore::delete_version`]; individual entries are only ever replaced.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store or replace one entry. Last write wins per key.
    ///
    /// Fails with [`Error::VersionNotInstalled`] if `version` does not exist.
    async fn put(&self, version: &str, key: &RequestKey, response: &CachedResponse) -> Result<(), Error>;

    /// Look up an entry, returning `None` on a miss.
    async fn get(&self, version: &str, key: &RequestKey, options: MatchOptions) -> Result<Option<CacheEntry>, Error>;

    /// All known version tags, sorted.
    async fn list_versions(&self) -> Result<Vec<String>, Error>;

    /// Remove a version and all its entries. Returns whether it existed.
    async fn delete_version(&self, version: &str) -> Result<bool, Error>;

    /// Atomically (re)create `version` holding exactly `entries`.
    async fn commit_version(&self, version: &str, entries: Vec<(RequestKey, CachedResponse)>) -> Result<(), Error>;

    async fn has_version(&self, version: &str) -> Result<bool, Error> {
        Ok(self.list_versions().await?.iter().any(|v| v == version))
    }
}
