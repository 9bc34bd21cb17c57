//! Unified error types for havn.
//!
//! Every variant renders with a stable, upper-case code prefix so the host
//! adapter and deployment tooling can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The cache store could not be reached at all.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    /// A write or activation addressed a version that was never installed.
    #[error("VERSION_NOT_INSTALLED: {0}")]
    VersionNotInstalled(String),

    /// A fallback asset could not be fetched; the install was abandoned.
    #[error("INSTALL_FAILED: {version}: {asset}: {reason}")]
    InstallFailed { version: String, asset: String, reason: String },

    /// Transport-level network failure (no HTTP response at all).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),
}

impl Error {
    /// Whether this error means the network never produced a response.
    ///
    /// HTTP error statuses are responses, not network failures, and never
    /// map to this. Neither does `FetchTooLarge`: the origin answered.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Error::Network(_) | Error::FetchTimeout(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::StoreUnavailable(msg) => (-32002, msg.clone()),
            Error::VersionNotInstalled(v) => (-32013, format!("version not installed: {v}")),
            Error::InstallFailed { .. } => (-32014, err.to_string()),
            Error::Network(msg) => (-32008, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("/offline.html".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("/offline.html"));
    }

    #[test]
    fn test_install_failed_display() {
        let err = Error::InstallFailed {
            version: "offline-v3".into(),
            asset: "/lib/icon_tab.webp".into(),
            reason: "status 404".into(),
        };
        assert_eq!(err.to_string(), "INSTALL_FAILED: offline-v3: /lib/icon_tab.webp: status 404");
    }

    #[test]
    fn test_network_failure_classification() {
        assert!(Error::Network("connection refused".into()).is_network_failure());
        assert!(Error::FetchTimeout("20000ms".into()).is_network_failure());
        assert!(!Error::StoreUnavailable("closed".into()).is_network_failure());
        assert!(!Error::CacheMiss("x".into()).is_network_failure());
        assert!(!Error::FetchTooLarge("6000000 bytes exceeds 5242880".into()).is_network_failure());
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let err = Error::InstallFailed { version: "v".into(), asset: "/a".into(), reason: "boom".into() };
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32014);
        assert!(mcp_err.message.contains("INSTALL_FAILED"));
    }
}
