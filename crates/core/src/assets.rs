//! The fallback resource set: resources that must be retrievable offline.
//!
//! Paths are site-relative and always start with `/`. The set keeps the
//! order it was configured in, which is also the order install reports
//! results in.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Ordered, immutable list of resource paths guaranteed cached after install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FallbackSet {
    paths: Vec<String>,
}

impl FallbackSet {
    /// Build a set from configured paths.
    ///
    /// Relative paths (`offline.html`) are anchored at the site root. Query
    /// strings and fragments are not part of a fallback path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for empty paths, paths carrying a query
    /// or fragment, and duplicates after normalization.
    pub fn new<I, S>(paths: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for raw in paths {
            let path = normalize_path(raw.as_ref())?;
            if normalized.contains(&path) {
                return Err(ConfigError::Invalid {
                    field: "fallback_assets".into(),
                    reason: format!("duplicate path {path}"),
                });
            }
            normalized.push(path);
        }
        Ok(Self { paths: normalized })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `path` is a member of the set. `path` must already be
    /// query-free.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for FallbackSet {
    type Error = ConfigError;

    fn try_from(paths: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(paths)
    }
}

impl From<FallbackSet> for Vec<String> {
    fn from(set: FallbackSet) -> Self {
        set.paths
    }
}

/// Anchor a configured path at the site root.
pub fn normalize_path(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid { field: "fallback_assets".into(), reason: "empty path".into() });
    }
    if trimmed.contains(['?', '#']) {
        return Err(ConfigError::Invalid {
            field: "fallback_assets".into(),
            reason: format!("{trimmed} must not carry a query or fragment"),
        });
    }
    if trimmed.contains("://") {
        return Err(ConfigError::Invalid {
            field: "fallback_assets".into(),
            reason: format!("{trimmed} must be site-relative"),
        });
    }

    Ok(if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") })
}
