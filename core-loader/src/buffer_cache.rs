//! # Recency-Bounded Buffer Cache
//!
//! Fixed-capacity in-process cache from resource key to decoded buffer with
//! least-recently-used eviction. Purely in-memory; no operation here can
//! fail or block on I/O.

use bridge_traits::decoder::AudioBuffer;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// LRU cache of decoded buffers.
///
/// In-flight operations are tracked by the request coalescer, not here;
/// clearing or evicting entries never touches a pending load.
pub struct BufferCache {
    inner: Mutex<LruCache<String, Arc<AudioBuffer>>>,
}

impl BufferCache {
    /// Create a cache holding at most `capacity` buffers.
    ///
    /// A capacity of zero is clamped to one; configuration validation
    /// rejects zero before it gets here.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(clamp_capacity(capacity))),
        }
    }

    /// Look up a buffer, marking the key most-recently-used on hit.
    pub fn get(&self, key: &str) -> Option<Arc<AudioBuffer>> {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or refresh a buffer. Inserting a new key at capacity evicts
    /// the least-recently-used entry first.
    pub fn insert(&self, key: String, buffer: Arc<AudioBuffer>) {
        self.inner.lock().put(key, buffer);
    }

    /// Membership check. A pure lookup is not an access: recency is
    /// deliberately untouched.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.inner.lock().clear();
        debug!("Buffer cache cleared");
    }

    /// Change the capacity at runtime. Shrinking evicts least-recently-used
    /// entries down to the new capacity.
    pub fn resize(&self, capacity: usize) {
        self.inner.lock().resize(clamp_capacity(capacity));
        debug!(capacity, "Buffer cache resized");
    }

    /// Number of cached buffers.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

fn clamp_capacity(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}
