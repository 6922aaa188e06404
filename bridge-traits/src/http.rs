//! HTTP Transport Abstraction
//!
//! Provides async HTTP operations with conditional-request headers,
//! streaming bodies, and abort support.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// HTTP request description.
///
/// The loader only ever issues GET requests; what varies per request is the
/// header set (conditional validators) and the abort signal.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
    /// Cooperative abort signal. Transports must stop the exchange and
    /// return [`BridgeError::Aborted`](crate::error::BridgeError::Aborted)
    /// once this token is cancelled.
    pub cancel: Option<CancellationToken>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
            cancel: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Response body: either fully buffered or a stream of chunks.
///
/// Transports should prefer `Stream` so the consumer can report progress
/// while bytes arrive; `Full` exists for transports (and test doubles) that
/// already hold the complete payload.
pub enum HttpBody {
    Full(Bytes),
    Stream(BoxStream<'static, Result<Bytes>>),
}

impl std::fmt::Debug for HttpBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpBody::Full(b) => f.debug_tuple("Full").field(&b.len()).finish(),
            HttpBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase for the status line (e.g. "Not Modified").
    pub status_text: String,
    /// Response headers with lowercased names.
    pub headers: HashMap<String, String>,
    pub body: HttpBody,
}

impl HttpResponse {
    /// Look up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.headers.get(name) {
            return Some(v.as_str());
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parsed `Content-Length`, when present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the origin answered a conditional request with 304.
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

/// Async HTTP transport trait
///
/// This trait abstracts the network so the loader core can run against any
/// client implementation. Implementations must:
/// - pass through all request headers unmodified (the core injects
///   `If-None-Match` / `If-Modified-Since` itself)
/// - surface the response status without treating 304 as an error
/// - honor the request's cancellation token
/// - expose response headers with lowercased names
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute a GET request.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, the request times out, or
    /// the abort signal fires. A response with a non-success status is NOT
    /// an error at this layer; interpretation belongs to the caller.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;
}
