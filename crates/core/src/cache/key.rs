//! Normalized request identity used as the cache key.

use sha2::{Digest, Sha256};
use url::Url;

use crate::Error;

/// Normalized request identity: upper-cased method plus the URL without its
/// fragment. Host case is already folded by URL parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: String,
}

/// Lookup options for [`crate::CacheStore::get`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Match on method and URL with the query string removed.
    pub ignore_query: bool,
}

impl MatchOptions {
    pub fn ignore_query() -> Self {
        Self { ignore_query: true }
    }
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url: url.into() }
    }

    /// GET key for a URL, the identity every cached asset is stored under.
    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    /// Parse an absolute URL string into a key.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(method, &parsed))
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL with its query string removed.
    pub fn url_without_query(&self) -> String {
        strip_query(&self.url)
    }

    /// Stable hex SHA-256 of the identity, used as the storage key.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

fn strip_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}
