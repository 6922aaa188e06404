//! # Conditional Fetch Executor
//!
//! Issues the network request for one resource, attaching validator headers
//! when revalidation was requested, and interprets the outcome:
//!
//! - full content: stream the body with progress reporting, then write body
//!   and metadata to the store as a pair
//! - not modified: return the stored body with a refreshed side-record
//! - not modified with no stored body: cache inconsistency; recover by
//!   re-fetching unconditionally
//!
//! A store failure is never a fetch failure: the pair is rolled back and
//! the freshly received bytes are still returned.

use crate::error::{LoaderError, Result};
use crate::metadata::CacheMetadata;
use crate::progress::{LoadProgress, SharedCallbacks};
use crate::store::CacheStoreAdapter;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpBody, HttpRequest, HttpResponse, HttpTransport};
use bridge_traits::store::ContentHeaders;
use bridge_traits::time::Clock;
use bytes::{Bytes, BytesMut};
use core_runtime::events::{CacheEvent, CacheTier, CoreEvent, EventBus};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub(crate) struct FetchExecutor<'a> {
    pub transport: &'a dyn HttpTransport,
    pub store: &'a CacheStoreAdapter,
    pub clock: &'a dyn Clock,
    pub events: Option<&'a EventBus>,
    pub callbacks: &'a SharedCallbacks,
}

impl FetchExecutor<'_> {
    /// Execute one fetch for `key`, conditional when `validators` carries
    /// an `ETag` or `Last-Modified`.
    pub async fn fetch(
        &self,
        key: &str,
        validators: Option<&CacheMetadata>,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        if cancel.is_cancelled() {
            return Err(LoaderError::Aborted);
        }

        let mut request = HttpRequest::new(key).cancellation(cancel.clone());
        if let Some(meta) = validators {
            if let Some(etag) = &meta.etag {
                request = request.header("If-None-Match", etag);
            }
            if let Some(last_modified) = &meta.last_modified {
                request = request.header("If-Modified-Since", last_modified);
            }
        }

        let response = self
            .transport
            .request(request)
            .await
            .map_err(map_transport)?;

        if response.is_success() {
            return self.consume_full(key, response, cancel).await;
        }
        if response.is_not_modified() {
            return self.revalidated(key, validators, response, cancel).await;
        }

        Err(LoaderError::Network {
            status: response.status,
            status_text: response.status_text,
        })
    }

    /// Handle a full-content response: stream, then persist the pair.
    async fn consume_full(
        &self,
        key: &str,
        response: HttpResponse,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let now = self.clock.unix_timestamp();
        let metadata = CacheMetadata::from_response(key, &response, now);

        let mut content_headers = ContentHeaders::new();
        if let Some(content_type) = response.header("content-type") {
            content_headers.insert("content-type".to_string(), content_type.to_string());
        }

        let bytes = self.collect(response, cancel).await?;

        // Write stage: cancellation is no longer observed from here on; the
        // pair either lands whole or is rolled back inside write_pair.
        if self
            .store
            .write_pair(key, bytes.clone(), &metadata, &content_headers)
            .await
            .is_err()
        {
            warn!(key, "Store write failed; returning fetched bytes anyway");
        }

        Ok(bytes)
    }

    /// Drain the response body into one buffer, reporting progress.
    async fn collect(
        &self,
        response: HttpResponse,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let total = response.content_length();

        match response.body {
            HttpBody::Full(bytes) => {
                let loaded = bytes.len() as u64;
                self.callbacks
                    .progress(&LoadProgress::new(loaded, total.or(Some(loaded))));
                Ok(bytes)
            }
            HttpBody::Stream(mut stream) => {
                // Known length: reserve the exact final size up front.
                // Unknown: grow geometrically and freeze to the received
                // length at the end.
                let mut buf = match total {
                    Some(expected) => BytesMut::with_capacity(expected as usize),
                    None => BytesMut::new(),
                };

                loop {
                    let chunk = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(LoaderError::Aborted),
                        chunk = stream.next() => chunk,
                    };
                    let Some(chunk) = chunk else { break };
                    let chunk = chunk.map_err(map_transport)?;
                    buf.extend_from_slice(&chunk);
                    self.callbacks
                        .progress(&LoadProgress::new(buf.len() as u64, total));
                }

                Ok(buf.freeze())
            }
        }
    }

    /// Handle a 304: serve the stored body, or recover from the
    /// inconsistent state where no body is on record.
    async fn revalidated(
        &self,
        key: &str,
        validators: Option<&CacheMetadata>,
        response: HttpResponse,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let response_cache_control = response.header("cache-control").map(str::to_string);

        if let Some(stored) = self.store.read_body(key).await {
            debug!(key, "Origin confirmed stored body unchanged");

            let now = self.clock.unix_timestamp();
            let refreshed = match validators {
                Some(prior) => prior.refreshed(response_cache_control, now),
                None => CacheMetadata {
                    url: key.to_string(),
                    etag: None,
                    last_modified: None,
                    cache_control: response_cache_control,
                    timestamp: now,
                },
            };
            if self.store.replace_metadata(key, &refreshed).await.is_err() {
                warn!(key, "Metadata refresh failed; previous pair remains consistent");
            }

            self.emit(CacheEvent::Hit {
                key: key.to_string(),
                tier: CacheTier::Store,
            });
            return Ok(stored);
        }

        // Cache inconsistency: the origin says "unchanged" but nothing is
        // on record. Force a full fetch without validators.
        warn!(key, "304 received but no stored body exists; forcing full fetch");

        let recovery = match self
            .transport
            .request(HttpRequest::new(key).cancellation(cancel.clone()))
            .await
        {
            Ok(response) => response,
            Err(BridgeError::Aborted) => return Err(LoaderError::Aborted),
            Err(e) => {
                return Err(LoaderError::Consistency {
                    status: 0,
                    reason: e.to_string(),
                })
            }
        };

        if recovery.is_success() {
            return self.consume_full(key, recovery, cancel).await;
        }

        Err(LoaderError::Consistency {
            status: recovery.status,
            reason: recovery.status_text,
        })
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = self.events {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}

fn map_transport(e: BridgeError) -> LoaderError {
    match e {
        BridgeError::Aborted => LoaderError::Aborted,
        other => LoaderError::Transport(other.to_string()),
    }
}
