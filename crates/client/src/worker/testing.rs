//! Test doubles for the network and the cache store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use havn_core::{CacheDb, CacheEntry, CacheStore, CachedResponse, Error, MatchOptions, RequestKey};
use reqwest::{StatusCode, header};

use crate::fetch::{CacheMode, FetchRequest, FetchResponse, Fetcher};

#[derive(Clone)]
enum Route {
    Respond(u16, Bytes),
    Fail,
    TooLarge,
}

/// Scripted network keyed by exact URL. Unknown URLs fail like an outage.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, Route>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
    reloads: AtomicUsize,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, status: u16, body: &str) -> Self {
        self.set_route(url, status, body);
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
        self
    }

    pub fn too_large(self, url: &str) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), Route::TooLarge);
        self
    }

    pub fn offline(self) -> Self {
        self.set_offline(true);
        self
    }

    pub fn set_route(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Respond(status, Bytes::from(body.to_string())));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reload_calls(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.lock().unwrap().push(request.url.to_string());
        if request.cache_mode == CacheMode::Reload {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: network unreachable", request.url)));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some(Route::Respond(status, body)) => {
                let mut headers = header::HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain"));
                Ok(FetchResponse {
                    url: request.url.clone(),
                    final_url: request.url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    content_type: Some("text/plain".into()),
                    bytes: body,
                    headers,
                    fetch_ms: 0,
                })
            }
            Some(Route::TooLarge) => Err(Error::FetchTooLarge(format!("{}: body exceeds limit", request.url))),
            Some(Route::Fail) | None => Err(Error::Network(format!("{}: connection refused", request.url))),
        }
    }
}

/// SQLite store that counts every read and write it serves.
pub struct CountingStore {
    inner: CacheDb,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner, reads: AtomicUsize::new(0), writes: AtomicUsize::new(0) }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn put(&self, version: &str, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(version, key, response).await
    }

    async fn get(&self, version: &str, key: &RequestKey, options: MatchOptions) -> Result<Option<CacheEntry>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(version, key, options).await
    }

    async fn list_versions(&self) -> Result<Vec<String>, Error> {
        self.inner.list_versions().await
    }

    async fn delete_version(&self, version: &str) -> Result<bool, Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_version(version).await
    }

    async fn commit_version(&self, version: &str, entries: Vec<(RequestKey, CachedResponse)>) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.commit_version(version, entries).await
    }
}

/// A store whose backend is gone.
pub struct UnavailableStore;

fn unavailable() -> Error {
    Error::StoreUnavailable("backend offline".into())
}

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn put(&self, _version: &str, _key: &RequestKey, _response: &CachedResponse) -> Result<(), Error> {
        Err(unavailable())
    }

    async fn get(
        &self, _version: &str, _key: &RequestKey, _options: MatchOptions,
    ) -> Result<Option<CacheEntry>, Error> {
        Err(unavailable())
    }

    async fn list_versions(&self) -> Result<Vec<String>, Error> {
        Err(unavailable())
    }

    async fn delete_version(&self, _version: &str) -> Result<bool, Error> {
        Err(unavailable())
    }

    async fn commit_version(&self, _version: &str, _entries: Vec<(RequestKey, CachedResponse)>) -> Result<(), Error> {
        Err(unavailable())
    }
}
