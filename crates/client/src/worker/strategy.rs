//! Per-request strategies.

use std::sync::Arc;

use havn_core::{CacheStore, CachedResponse, Error, MatchOptions, RequestKey};
use serde::Serialize;
use url::Url;

use super::{CacheManager, Classification, RequestDescriptor};
use crate::fetch::{CacheMode, FetchRequest, Fetcher, resolve};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The fallback document, served in place of a failed navigation.
    Fallback,
}

/// A response produced by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

/// What the host should do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Not handled; the host performs the request itself, see
    /// [`CacheManager::fetch_uncached`].
    Passthrough,
    Respond(Served),
}

impl CacheManager {
    /// Route one request to its strategy.
    ///
    /// # Errors
    ///
    /// Only when no response can be produced at all: a navigation whose
    /// network fetch failed with no readable fallback document, an asset
    /// that is neither cached nor reachable, or a response over the size
    /// limit.
    pub async fn intercept(&self, request: &RequestDescriptor) -> Result<Interception, Error> {
        let url = match resolve(self.classifier.origin(), &request.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = %request.url, "not intercepting: {e}");
                return Ok(Interception::Passthrough);
            }
        };

        let served = match self.classifier.classify(&request.method, request.navigate, &url) {
            Classification::Passthrough => return Ok(Interception::Passthrough),
            Classification::Navigation => self.network_first(&request.method, url).await?,
            Classification::Asset => self.cache_first(url).await?,
        };
        Ok(Interception::Respond(served))
    }

    /// Network first; the fallback document replaces a transport failure.
    /// HTTP error statuses are returned as they are and nothing is cached.
    async fn network_first(&self, method: &str, url: Url) -> Result<Served, Error> {
        let request = FetchRequest { method: method.to_string(), url, cache_mode: CacheMode::Default };
        let err = match self.network.fetch(&request).await {
            Ok(response) => return Ok(Served { response: response.to_cached(), source: ResponseSource::Network }),
            Err(err) if err.is_network_failure() => err,
            Err(err) => return Err(err),
        };

        match self.store.get(&self.version, &self.fallback_key, MatchOptions::default()).await {
            Ok(Some(entry)) => {
                tracing::info!(url = %request.url, "network unavailable, serving fallback document");
                Ok(Served { response: entry.response, source: ResponseSource::Fallback })
            }
            Ok(None) => {
                tracing::warn!(version = %self.version, "navigation failed and fallback document is not cached");
                Err(err)
            }
            Err(store_err) => {
                tracing::warn!(version = %self.version, "navigation failed and fallback unreadable: {store_err}");
                Err(err)
            }
        }
    }

    /// Cache first with background refresh (stale-while-revalidate).
    ///
    /// Lookups ignore the query string. A miss, or a store that cannot be
    /// read, falls through to the network and stores a 2xx result.
    ///
    /// The refresh replaces the entry that was served, under its own key. A
    /// response fetched on a miss is stored without its query string, so
    /// query variants of one asset share a single entry.
    async fn cache_first(&self, url: Url) -> Result<Served, Error> {
        let key = RequestKey::get(&url);

        match self.store.get(&self.version, &key, MatchOptions::ignore_query()).await {
            Ok(Some(entry)) => {
                self.spawn_refresh(url, entry.key).await;
                return Ok(Served { response: entry.response, source: ResponseSource::Cache });
            }
            Ok(None) => tracing::debug!(%key, "cache miss"),
            Err(e) => tracing::warn!(%key, "cache read failed, using network: {e}"),
        }

        let mut bare = url.clone();
        bare.set_query(None);
        let store_key = RequestKey::get(&bare);

        let response = self.network.fetch(&FetchRequest::get(url)).await?.to_cached();
        if response.is_success()
            && let Err(e) = self.store.put(&self.version, &store_key, &response).await
        {
            tracing::warn!(key = %store_key, "failed to store response: {e}");
        }
        Ok(Served { response, source: ResponseSource::Network })
    }

    /// Perform a request directly against the network, the way the host
    /// handles a passthrough. The store is not consulted.
    pub async fn fetch_uncached(&self, request: &RequestDescriptor) -> Result<CachedResponse, Error> {
        let url = resolve(self.classifier.origin(), &request.url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", request.url)))?;
        let fetch = FetchRequest { method: request.method.clone(), url, cache_mode: CacheMode::Default };
        Ok(self.network.fetch(&fetch).await?.to_cached())
    }

    async fn spawn_refresh(&self, url: Url, key: RequestKey) {
        let store = Arc::clone(&self.store);
        let network = Arc::clone(&self.network);
        let version = self.version.clone();

        let mut tasks = self.background.lock().await;
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                tracing::warn!("background refresh task failed: {e}");
            }
        }
        tasks.spawn(refresh(store, network, version, url, key));
    }
}

async fn refresh(store: Arc<dyn CacheStore>, network: Arc<dyn Fetcher>, version: String, url: Url, key: RequestKey) {
    let response = match network.fetch(&FetchRequest::get(url)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(%key, "refresh failed, keeping cached entry: {e}");
            return;
        }
    };

    if !response.status.is_success() {
        tracing::debug!(%key, status = response.status.as_u16(), "refresh returned error status, keeping cached entry");
        return;
    }

    // put refuses versions that no longer exist, so a purge always wins.
    match store.put(&version, &key, &response.to_cached()).await {
        Ok(()) => tracing::debug!(%key, %version, "refreshed cache entry"),
        Err(e) => tracing::debug!(%key, %version, "refresh not stored: {e}"),
    }
}
