//! Install and activate.
//!
//! Both are plain functions of a store (and, for install, the network) so
//! they can be driven without a manager. [`CacheManager`] wraps them with
//! the worker state machine and the transition lock.
//!
//! [`CacheManager`]: super::CacheManager

use futures_util::future::try_join_all;
use havn_core::{CacheStore, CachedResponse, Error, FallbackSet, RequestKey};
use serde::Serialize;
use url::Url;

use crate::fetch::{FetchRequest, Fetcher, resolve};

/// One fallback asset written by a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledAsset {
    pub path: String,
    pub url: String,
    pub status: u16,
    pub bytes: usize,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub version: String,
    pub assets: Vec<InstalledAsset>,
}

/// Outcome of activate. An empty `purged` list is the no-op case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub version: String,
    pub purged: Vec<String>,
}

fn install_failed(version: &str, asset: &str, reason: impl Into<String>) -> Error {
    Error::InstallFailed { version: version.to_string(), asset: asset.to_string(), reason: reason.into() }
}

/// Populate `version` with fresh copies of every fallback asset.
///
/// All assets are fetched concurrently with the cache bypassed, and nothing
/// is written until every one of them has returned a 2xx response. The
/// version is then committed in one transaction, replacing whatever an
/// earlier install of the same tag left behind.
///
/// # Errors
///
/// Returns `Error::InstallFailed` naming the first asset that failed. No
/// entry of this attempt is visible afterwards and other versions are
/// untouched.
pub async fn install(
    store: &dyn CacheStore, network: &dyn Fetcher, origin: &Url, version: &str, assets: &FallbackSet,
) -> Result<InstallReport, Error> {
    let targets = assets
        .iter()
        .map(|path| {
            resolve(origin, path)
                .map(|url| (path, url))
                .map_err(|e| install_failed(version, path, e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let fetches = targets.into_iter().map(|(path, url)| async move {
        let response = network
            .fetch(&FetchRequest::reload(url.clone()))
            .await
            .map_err(|e| install_failed(version, path, e.to_string()))?;
        if !response.status.is_success() {
            return Err(install_failed(version, path, format!("status {}", response.status.as_u16())));
        }
        Ok::<_, Error>((path, url, response.to_cached()))
    });

    let staged: Vec<(&str, Url, CachedResponse)> = match try_join_all(fetches).await {
        Ok(staged) => staged,
        Err(err) => {
            tracing::warn!(version, "install abandoned: {}", err);
            return Err(err);
        }
    };

    let report = InstallReport {
        version: version.to_string(),
        assets: staged
            .iter()
            .map(|(path, url, response)| InstalledAsset {
                path: path.to_string(),
                url: url.to_string(),
                status: response.status,
                bytes: response.body.len(),
            })
            .collect(),
    };

    let entries = staged
        .into_iter()
        .map(|(_, url, response)| (RequestKey::get(&url), response))
        .collect();
    store.commit_version(version, entries).await?;

    tracing::info!(version, assets = report.assets.len(), "installed cache version");
    Ok(report)
}

/// Delete every version other than `current`.
///
/// # Errors
///
/// Returns `Error::VersionNotInstalled` without deleting anything if
/// `current` is not in the store, so a version that failed to populate can
/// never displace a working one.
pub async fn activate(store: &dyn CacheStore, current: &str) -> Result<ActivateReport, Error> {
    let versions = store.list_versions().await?;
    if !versions.iter().any(|v| v == current) {
        return Err(Error::VersionNotInstalled(current.to_string()));
    }

    let mut purged = Vec::new();
    for stale in versions.into_iter().filter(|v| v != current) {
        if store.delete_version(&stale).await? {
            tracing::info!(version = %stale, "purged stale cache version");
            purged.push(stale);
        }
    }

    if purged.is_empty() {
        tracing::debug!(version = current, "activate found no stale versions");
    }

    Ok(ActivateReport { version: current.to_string(), purged })
}
