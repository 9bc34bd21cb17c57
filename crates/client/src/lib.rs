//! Client side of havn.
//!
//! This crate provides the HTTP fetch pipeline and the request-interception
//! worker (lifecycle and strategies) that the server hosts.

pub mod fetch;
pub mod worker;

pub use fetch::{CacheMode, FetchClient, FetchConfig, FetchRequest, FetchResponse, Fetcher};
pub use worker::{
    ActivateReport, CacheManager, Classification, InstallReport, InstalledAsset, Interception, ManagerConfig,
    RequestClassifier, RequestDescriptor, ResponseSource, Served, WorkerHooks, WorkerState,
};
