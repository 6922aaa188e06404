//! # Sample Loader
//!
//! Public entry point of the resource cache. Resolves a resource key to a
//! decoded buffer through three tiers: the in-memory buffer cache, the
//! persistent byte store, and the network, with per-key request coalescing
//! in front of the slow tiers.

use crate::buffer_cache::BufferCache;
use crate::coalesce::{LoadOutcome, RequestCoalescer};
use crate::data_url;
use crate::error::{LoaderError, Result};
use crate::fetch::FetchExecutor;
use crate::freshness::{self, FreshnessDecision};
use crate::progress::LoadCallbacks;
use crate::store::CacheStoreAdapter;
use bridge_traits::decoder::{AudioBuffer, AudioDecoder};
use bridge_traits::http::HttpTransport;
use bridge_traits::store::ByteStore;
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::config::LoaderConfig;
use core_runtime::events::{CacheEvent, CacheTier, CoreEvent, EventBus};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Three-tier resource cache for decoded audio buffers.
///
/// Owns the in-memory buffer cache and the pending-operation table; one
/// loader value is constructed per process (or per test) and shared by
/// reference.
///
/// # Example
///
/// ```rust,ignore
/// use core_loader::SampleLoader;
/// use core_runtime::config::LoaderConfig;
/// use std::sync::Arc;
///
/// let loader = SampleLoader::new(LoaderConfig::default(), transport, store)?;
/// let buffer = loader
///     .get_audio_buffer(decoder, "https://example.com/kick.wav", None, Default::default())
///     .await?;
/// ```
pub struct SampleLoader {
    config: LoaderConfig,
    cache_ttl: Arc<RwLock<Duration>>,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn ByteStore>,
    clock: Arc<dyn Clock>,
    event_bus: Option<Arc<EventBus>>,
    buffer_cache: Arc<BufferCache>,
    coalescer: Arc<RequestCoalescer>,
}

impl SampleLoader {
    /// Create a loader over the given transport and persistent store.
    ///
    /// # Errors
    ///
    /// Fails when the configuration does not validate.
    pub fn new(
        config: LoaderConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn ByteStore>,
    ) -> core_runtime::Result<Self> {
        config.validate()?;

        Ok(Self {
            cache_ttl: Arc::new(RwLock::new(config.cache_ttl)),
            buffer_cache: Arc::new(BufferCache::new(config.buffer_cache_capacity)),
            coalescer: Arc::new(RequestCoalescer::new()),
            clock: Arc::new(SystemClock),
            event_bus: None,
            config,
            transport,
            store,
        })
    }

    /// Replace the time source, for deterministic freshness under test.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach an event bus for cache and loading notifications.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Resolve `key` to a decoded buffer.
    ///
    /// Inline `data:` payloads are decoded directly. Otherwise the memory
    /// tier answers, or the call joins the coalesced pipeline: freshness
    /// decision, store read or conditional fetch, decode, memory insert.
    ///
    /// # Errors
    ///
    /// Terminal failures are [`LoaderError::Network`],
    /// [`LoaderError::Decode`], [`LoaderError::Consistency`], and, for the
    /// caller whose own signal fired, [`LoaderError::Aborted`]. Store
    /// failures degrade instead of failing the call.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn get_audio_buffer(
        &self,
        decoder: Arc<dyn AudioDecoder>,
        key: &str,
        cancel: Option<CancellationToken>,
        callbacks: LoadCallbacks,
    ) -> Result<Arc<AudioBuffer>> {
        if cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
            return Err(LoaderError::Aborted);
        }

        // Inline payloads bypass the store and the network entirely.
        if data_url::is_data_url(key) {
            let payload = data_url::decode(key)?;
            let buffer = decoder
                .decode(payload)
                .await
                .map(Arc::new)
                .map_err(|e| LoaderError::Decode(e.to_string()))?;
            self.buffer_cache.insert(key.to_string(), buffer.clone());
            return Ok(buffer);
        }

        if let Some(buffer) = self.buffer_cache.get(key) {
            debug!(key, "Memory cache hit");
            self.emit(CacheEvent::Hit {
                key: key.to_string(),
                tier: CacheTier::Memory,
            });
            return Ok(buffer);
        }

        let work = {
            let transport = self.transport.clone();
            let store = self.store.clone();
            let clock = self.clock.clone();
            let events = self.event_bus.clone();
            let buffer_cache = self.buffer_cache.clone();
            let cache_ttl = self.cache_ttl.clone();
            let store_name = self.config.store_name.clone();
            let key = key.to_string();

            move |op_cancel: CancellationToken, shared_callbacks| async move {
                let emit = |event: CacheEvent| {
                    if let Some(bus) = &events {
                        bus.emit(CoreEvent::Cache(event)).ok();
                    }
                };

                let handle = match store.open(&store_name).await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Store open failed; continuing without persistent tier");
                        emit(CacheEvent::StoreError {
                            key: key.clone(),
                            operation: "open".to_string(),
                            message: e.to_string(),
                        });
                        None
                    }
                };
                let adapter = CacheStoreAdapter::new(handle, events.clone());

                let metadata = adapter.read_metadata(&key).await;
                let now = clock.unix_timestamp();
                let ttl = *cache_ttl.read();
                let decision = freshness::evaluate(metadata.as_ref(), now, ttl);
                debug!(key = %key, ?decision, "Freshness decision");

                let executor = FetchExecutor {
                    transport: transport.as_ref(),
                    store: &adapter,
                    clock: clock.as_ref(),
                    events: events.as_deref(),
                    callbacks: &shared_callbacks,
                };

                let bytes = match decision {
                    FreshnessDecision::ServeFromStore => {
                        match adapter.read_body(&key).await {
                            Some(bytes) => {
                                emit(CacheEvent::Hit {
                                    key: key.clone(),
                                    tier: CacheTier::Store,
                                });
                                bytes
                            }
                            // read failure or vanished body: treat as a
                            // miss and fetch unconditionally
                            None => {
                                emit(CacheEvent::Miss {
                                    key: key.clone(),
                                    reason: "store-body-missing".to_string(),
                                });
                                executor.fetch(&key, None, &op_cancel).await?
                            }
                        }
                    }
                    FreshnessDecision::RevalidateConditional => {
                        executor.fetch(&key, metadata.as_ref(), &op_cancel).await?
                    }
                    FreshnessDecision::FetchUnconditional => {
                        let reason = if metadata.is_none() {
                            "no-metadata"
                        } else {
                            "expired"
                        };
                        emit(CacheEvent::Miss {
                            key: key.clone(),
                            reason: reason.to_string(),
                        });
                        executor.fetch(&key, None, &op_cancel).await?
                    }
                };

                let buffer = decoder
                    .decode(bytes.clone())
                    .await
                    .map(Arc::new)
                    .map_err(|e| LoaderError::Decode(e.to_string()))?;

                buffer_cache.insert(key.clone(), buffer.clone());

                Ok(LoadOutcome {
                    buffer,
                    encoded_size: bytes.len() as u64,
                })
            }
        };

        self.coalescer
            .run_or_join(key, cancel, callbacks, self.event_bus.clone(), work)
            .await
    }

    /// Change the freshness TTL fallback while running.
    pub fn set_cache_ttl(&self, ttl: Duration) {
        *self.cache_ttl.write() = ttl;
    }

    /// Current freshness TTL fallback.
    pub fn cache_ttl(&self) -> Duration {
        *self.cache_ttl.read()
    }

    /// Change the buffer cache capacity while running. Shrinking evicts
    /// least-recently-used entries immediately.
    pub fn set_buffer_capacity(&self, capacity: usize) {
        self.buffer_cache.resize(capacity);
    }

    /// Drop every decoded buffer from the memory tier. In-flight
    /// operations are unaffected.
    pub fn clear_memory_cache(&self) {
        self.buffer_cache.clear();
    }

    /// Whether the memory tier currently holds `key`. Does not touch
    /// recency.
    pub fn cached_in_memory(&self, key: &str) -> bool {
        self.buffer_cache.contains(key)
    }

    /// Number of buffers in the memory tier.
    pub fn memory_cache_len(&self) -> usize {
        self.buffer_cache.len()
    }

    /// Number of keys with a load in flight.
    pub fn pending_loads(&self) -> usize {
        self.coalescer.pending_count()
    }

    /// Remove a resource's body and metadata pair from the persistent
    /// store. Returns whether a body existed.
    ///
    /// # Errors
    ///
    /// Fails with [`LoaderError::Store`] when the store cannot be opened.
    #[instrument(skip(self))]
    pub async fn remove_from_store(&self, key: &str) -> Result<bool> {
        let handle = self
            .store
            .open(&self.config.store_name)
            .await
            .map_err(|e| LoaderError::Store(e.to_string()))?;
        let adapter = CacheStoreAdapter::new(Some(handle), self.event_bus.clone());
        Ok(adapter.delete_pair(key).await)
    }

    /// The configuration the loader was constructed with. `cache_ttl` and
    /// buffer capacity may have been changed since via the setters.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}
