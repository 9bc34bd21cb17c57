//! Request classification.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//! 1. Navigations (new document loads) on the site origin
//! 2. GET requests on the site origin whose path matches the asset pattern
//!    list, query string ignored
//! 3. Everything else passes through

use havn_core::{Error, FallbackSet};
use regex::Regex;
use url::Url;

use crate::fetch::same_origin;

/// Which strategy a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Network first, fallback document on network failure.
    Navigation,
    /// Cache first with background refresh.
    Asset,
    /// Not intercepted.
    Passthrough,
}

/// One entry of the ordered asset pattern list.
#[derive(Debug, Clone)]
pub enum AssetPattern {
    /// Exact path, as listed in the fallback resource set.
    Exact(String),
    /// Regular expression matched against the path.
    Regex(Regex),
}

impl AssetPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            AssetPattern::Exact(p) => p == path,
            AssetPattern::Regex(re) => re.is_match(path),
        }
    }
}

/// Deterministic request classifier for one site origin.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    origin: Url,
    patterns: Vec<AssetPattern>,
}

impl RequestClassifier {
    /// Classifier whose asset list is exactly the fallback resource set, in
    /// its configured order.
    pub fn new(origin: Url, fallback: &FallbackSet) -> Self {
        let patterns = fallback.iter().map(|p| AssetPattern::Exact(p.to_string())).collect();
        Self { origin, patterns }
    }

    /// Append a regular-expression path pattern after the existing ones.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, Error> {
        let re = Regex::new(pattern).map_err(|e| Error::InvalidInput(format!("asset pattern {pattern}: {e}")))?;
        self.patterns.push(AssetPattern::Regex(re));
        Ok(self)
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn patterns(&self) -> &[AssetPattern] {
        &self.patterns
    }

    pub fn classify(&self, method: &str, navigate: bool, url: &Url) -> Classification {
        if !same_origin(&self.origin, url) {
            return Classification::Passthrough;
        }

        if navigate {
            return Classification::Navigation;
        }

        if method.eq_ignore_ascii_case("GET") && self.patterns.iter().any(|p| p.matches(url.path())) {
            return Classification::Asset;
        }

        Classification::Passthrough
    }
}
