//! # Cache Metadata Model
//!
//! Immutable snapshot of one resource's validation state, stored as a JSON
//! side-record next to the body. Records are replaced wholesale on every
//! refresh, never mutated field-by-field, so readers can never observe a
//! partially updated record.

use bridge_traits::http::HttpResponse;
use serde::{Deserialize, Serialize};

/// Key of the metadata side-record for a resource key.
pub fn meta_key(key: &str) -> String {
    format!("{key}:meta")
}

/// Validation state for one stored resource.
///
/// `timestamp` is the unix second at which the body was last confirmed
/// fresh (full fetch) or confirmed unchanged (304). It is never advanced by
/// a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    pub timestamp: i64,
}

impl CacheMetadata {
    /// Build a record from a full-content response.
    ///
    /// Captures the response's validators and freshness directive; absent
    /// headers become `None` rather than carrying anything forward.
    pub fn from_response(url: impl Into<String>, response: &HttpResponse, now: i64) -> Self {
        Self {
            url: url.into(),
            etag: response.header("etag").map(str::to_string),
            last_modified: response.header("last-modified").map(str::to_string),
            cache_control: response.header("cache-control").map(str::to_string),
            timestamp: now,
        }
    }

    /// Build the replacement record after a 304.
    ///
    /// Validators are carried over from the prior record (the origin said
    /// the body did not change), the timestamp is refreshed, and the
    /// freshness directive is taken from the response when it carries one,
    /// else retained.
    pub fn refreshed(&self, response_cache_control: Option<String>, now: i64) -> Self {
        Self {
            url: self.url.clone(),
            etag: self.etag.clone(),
            last_modified: self.last_modified.clone(),
            cache_control: response_cache_control.or_else(|| self.cache_control.clone()),
            timestamp: now,
        }
    }

    /// Whether this record carries a usable conditional-request validator.
    pub fn has_validator(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    /// Serialize to the stored JSON form.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse the stored JSON form.
    pub fn from_json(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}
