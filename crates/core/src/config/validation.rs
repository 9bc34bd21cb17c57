//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `version_tag` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `fallback_assets` has empty or duplicate paths
    /// - `fallback_document` is not one of `fallback_assets`
    /// - an `asset_patterns` entry is not a valid regular expression
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version_tag.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "version_tag".into(),
                hint: "Set HAVN_VERSION_TAG to the release's cache version".into(),
            });
        }

        self.origin_url()?;

        let fallback = self.fallback_set()?;
        let document = self.fallback_document_path()?;
        if !fallback.contains(&document) {
            return Err(ConfigError::Invalid {
                field: "fallback_document".into(),
                reason: format!("{document} is not listed in fallback_assets"),
            });
        }

        for pattern in &self.asset_patterns {
            regex::Regex::new(pattern).map_err(|e| ConfigError::Invalid {
                field: "asset_patterns".into(),
                reason: format!("{pattern}: {e}"),
            })?;
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.install_on_start && !self.skip_waiting {
            tracing::warn!(
                version = %self.version_tag,
                "install_on_start without skip_waiting leaves the new version installed but not active"
            );
        }

        Ok(())
    }
}
