//! Offline request interception.
//!
//! ### Lifecycle
//! - `install` fetches the fallback resource set with the cache bypassed and
//!   commits it as a new version, all or nothing.
//! - `activate` deletes every other version and claims open sessions.
//!
//! ### Strategies
//! - Navigations: network first, fallback document on network failure.
//! - Fallback assets: cache first, refreshed in the background
//!   (stale-while-revalidate).
//! - Everything else: passthrough, the store is never touched.
//!
//! A [`CacheManager`] is built once per deployed version and handed to the
//! host, which drives it through [`WorkerHooks`].

pub mod classify;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use havn_core::{AppConfig, CacheStore, Error, FallbackSet, RequestKey};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::fetch::{Fetcher, resolve};

pub use classify::{AssetPattern, Classification, RequestClassifier};
pub use lifecycle::{ActivateReport, InstallReport, InstalledAsset};
pub use strategy::{Interception, ResponseSource, Served};

/// An intercepted request as the host describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    /// Absolute URL, or a path relative to the site origin.
    pub url: String,
    /// True for a new top-level document load.
    #[serde(default)]
    pub navigate: bool,
}

impl RequestDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".into(), url: url.into(), navigate: false }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self { method: "GET".into(), url: url.into(), navigate: true }
    }
}

/// Worker lifecycle states, after the browser service worker model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// The install for this version failed.
    Redundant,
}

/// Callbacks the host runtime invokes.
#[async_trait]
pub trait WorkerHooks: Send + Sync {
    /// Once per deployment of a new version.
    async fn on_install(&self) -> Result<InstallReport, Error>;

    /// After install succeeds, or on startup with an installed version.
    async fn on_activate(&self) -> Result<ActivateReport, Error>;

    /// Per outgoing request.
    async fn on_intercept(&self, request: RequestDescriptor) -> Result<Interception, Error>;
}

/// Static description of what a manager serves.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub version: String,
    pub fallback: FallbackSet,
    /// Site-relative path of the document served to offline navigations.
    pub fallback_document: String,
    pub classifier: RequestClassifier,
}

impl ManagerConfig {
    /// Build from loaded application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let invalid = |e: havn_core::ConfigError| Error::InvalidInput(e.to_string());
        let origin = config.origin_url().map_err(invalid)?;
        let fallback = config.fallback_set().map_err(invalid)?;
        let fallback_document = config.fallback_document_path().map_err(invalid)?;

        let mut classifier = RequestClassifier::new(origin, &fallback);
        for pattern in &config.asset_patterns {
            classifier = classifier.with_pattern(pattern)?;
        }

        Ok(Self { version: config.version_tag.clone(), fallback, fallback_document, classifier })
    }
}

/// The offline cache for one version tag.
pub struct CacheManager {
    version: String,
    fallback: FallbackSet,
    fallback_key: RequestKey,
    classifier: RequestClassifier,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Fetcher>,
    state: RwLock<WorkerState>,
    transition: Mutex<()>,
    background: Mutex<JoinSet<()>>,
}

impl CacheManager {
    /// Create a manager.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the version tag is empty or the
    /// fallback document is not part of the fallback set.
    pub fn new(config: ManagerConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Fetcher>) -> Result<Self, Error> {
        if config.version.trim().is_empty() {
            return Err(Error::InvalidInput("version tag cannot be empty".into()));
        }
        if !config.fallback.contains(&config.fallback_document) {
            return Err(Error::InvalidInput(format!(
                "fallback document {} is not in the fallback set",
                config.fallback_document
            )));
        }

        let document_url = resolve(config.classifier.origin(), &config.fallback_document)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            version: config.version,
            fallback: config.fallback,
            fallback_key: RequestKey::get(&document_url),
            classifier: config.classifier,
            store,
            network,
            state: RwLock::new(WorkerState::Parsed),
            transition: Mutex::new(()),
            background: Mutex::new(JoinSet::new()),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fallback(&self) -> &FallbackSet {
        &self.fallback
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, next: WorkerState) -> WorkerState {
        let mut state = self.state.write().await;
        let previous = *state;
        if previous != next {
            tracing::debug!(version = %self.version, from = ?previous, to = ?next, "worker state change");
            *state = next;
        }
        previous
    }

    /// Install this manager's version.
    ///
    /// On failure a manager that had never installed becomes `Redundant`;
    /// one that already had its version installed keeps its state, since
    /// the failed attempt changed nothing.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let _transition = self.transition.lock().await;
        let previous = self.set_state(WorkerState::Installing).await;

        let result = lifecycle::install(
            self.store.as_ref(),
            self.network.as_ref(),
            self.classifier.origin(),
            &self.version,
            &self.fallback,
        )
        .await;

        match result {
            Ok(report) => {
                let next = if previous == WorkerState::Activated { previous } else { WorkerState::Installed };
                self.set_state(next).await;
                Ok(report)
            }
            Err(err) => {
                let next = match previous {
                    WorkerState::Installed | WorkerState::Activated => previous,
                    _ => WorkerState::Redundant,
                };
                self.set_state(next).await;
                Err(err)
            }
        }
    }

    /// Activate this manager's version, purging every other one.
    ///
    /// Refused for a manager whose install failed, and for a version that
    /// is not in the store.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let _transition = self.transition.lock().await;
        if self.state().await == WorkerState::Redundant {
            return Err(Error::VersionNotInstalled(self.version.clone()));
        }

        let previous = self.set_state(WorkerState::Activating).await;
        match lifecycle::activate(self.store.as_ref(), &self.version).await {
            Ok(report) => {
                self.set_state(WorkerState::Activated).await;
                tracing::info!(version = %self.version, purged = report.purged.len(), "activated; clients claimed");
                Ok(report)
            }
            Err(err) => {
                self.set_state(previous).await;
                Err(err)
            }
        }
    }

    /// Wait for every outstanding background refresh to finish.
    pub async fn settle(&self) {
        let mut tasks = std::mem::take(&mut *self.background.lock().await);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!("background refresh task failed: {e}");
            }
        }
    }
}

#[async_trait]
impl WorkerHooks for CacheManager {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        self.install().await
    }

    async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.activate().await
    }

    async fn on_intercept(&self, request: RequestDescriptor) -> Result<Interception, Error> {
        self.intercept(&request).await
    }
}
