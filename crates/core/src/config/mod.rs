//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HAVN_*)
//! 2. TOML config file (if HAVN_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The version tag and the fallback resource set are deployment values: the
//! release tooling bumps `version_tag` on every deploy.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::assets::{FallbackSet, normalize_path};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HAVN_*)
/// 2. TOML config file (if HAVN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag naming the cache generation this deployment installs.
    ///
    /// Set via HAVN_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Origin of the site whose requests are intercepted.
    ///
    /// Fallback asset paths are resolved against it, and requests for any
    /// other origin are never intercepted.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Resources that must be retrievable offline, in install order.
    #[serde(default = "default_fallback_assets")]
    pub fallback_assets: Vec<String>,

    /// The fallback document served to navigations when the network is down.
    ///
    /// Must be one of `fallback_assets`.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Extra regular-expression path patterns served cache-first.
    ///
    /// Evaluated in order after the exact fallback paths.
    #[serde(default)]
    pub asset_patterns: Vec<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via HAVN_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Run install (and activate, with `skip_waiting`) when the host starts.
    #[serde(default)]
    pub install_on_start: bool,

    /// Activate right after a successful install instead of waiting for an
    /// explicit activate trigger.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,
}

fn default_version_tag() -> String {
    "offline-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_fallback_assets() -> Vec<String> {
    vec!["/offline.html".into(), "/lib/icon_tab.webp".into()]
}

fn default_fallback_document() -> String {
    "/offline.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./havn-cache.sqlite")
}

fn default_user_agent() -> String {
    "havn/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version_tag: default_version_tag(),
            origin: default_origin(),
            fallback_assets: default_fallback_assets(),
            fallback_document: default_fallback_document(),
            asset_patterns: Vec::new(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            install_on_start: false,
            skip_waiting: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HAVN_`
    /// 2. TOML file from `HAVN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HAVN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HAVN_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The fallback resource set in configured order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for empty or duplicate paths.
    pub fn fallback_set(&self) -> Result<FallbackSet, ConfigError> {
        FallbackSet::new(&self.fallback_assets)
    }

    /// The fallback document, anchored at the site root.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the path is empty or not site-relative.
    pub fn fallback_document_path(&self) -> Result<String, ConfigError> {
        normalize_path(&self.fallback_document).map_err(|_| ConfigError::Invalid {
            field: "fallback_document".into(),
            reason: format!("{} is not a site-relative path", self.fallback_document),
        })
    }

    /// The parsed site origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute
    /// http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin).map_err(|e| ConfigError::Invalid {
            field: "origin".into(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme {scheme}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version_tag, "offline-v1");
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.fallback_assets, vec!["/offline.html", "/lib/icon_tab.webp"]);
        assert_eq!(config.fallback_document, "/offline.html");
        assert!(config.asset_patterns.is_empty());
        assert_eq!(config.db_path, PathBuf::from("./havn-cache.sqlite"));
        assert_eq!(config.user_agent, "havn/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert!(!config.install_on_start);
        assert!(config.skip_waiting);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_fallback_set_from_config() {
        let config = AppConfig {
            fallback_assets: vec!["offline.html".into(), "lib/icon_tab.webp".into()],
            ..Default::default()
        };
        let set = config.fallback_set().unwrap();
        assert_eq!(set.paths(), ["/offline.html", "/lib/icon_tab.webp"]);
    }

    #[test]
    fn test_fallback_document_anchored() {
        let config = AppConfig { fallback_document: "offline.html".into(), ..Default::default() };
        assert_eq!(config.fallback_document_path().unwrap(), "/offline.html");
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig { origin: "https://example.org".into(), ..Default::default() };
        assert_eq!(config.origin_url().unwrap().host_str(), Some("example.org"));

        let config = AppConfig { origin: "ftp://example.org".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "havn.toml",
                r#"
                version_tag = "offline-v3"
                origin = "https://example.org"
                fallback_assets = ["/offline.html", "/lib/icon_tab.webp"]
                "#,
            )?;
            jail.set_env("HAVN_CONFIG_FILE", "havn.toml");
            jail.set_env("HAVN_TIMEOUT_MS", "5000");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.version_tag, "offline-v3");
            assert_eq!(config.origin, "https://example.org");
            assert_eq!(config.timeout_ms, 5000);
            Ok(())
        });
    }
}
