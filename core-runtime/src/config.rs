//! # Loader Configuration
//!
//! Runtime configuration for the sample loader: freshness TTL fallback,
//! in-memory buffer cache capacity, and the persistent store namespace.
//!
//! The TTL and the buffer capacity can also be changed while the loader is
//! running (`SampleLoader::set_cache_ttl` / `set_buffer_capacity`); the
//! values here are the starting point.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default freshness TTL used when stored metadata carries no validator
/// and no usable `max-age` directive.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default capacity of the in-memory decoded-buffer cache, in entries.
pub const DEFAULT_BUFFER_CACHE_CAPACITY: usize = 100;

/// Default name of the persistent byte store namespace.
pub const DEFAULT_STORE_NAME: &str = "audio-buffer-cache";

/// Configuration for the sample loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Freshness TTL fallback for validator-less metadata (default: 24h)
    pub cache_ttl: Duration,

    /// Maximum number of decoded buffers kept in memory (default: 100)
    pub buffer_cache_capacity: usize,

    /// Name of the persistent store namespace the loader opens
    pub store_name: String,

    /// Buffer size of the event bus broadcast channel
    pub event_buffer_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            buffer_cache_capacity: DEFAULT_BUFFER_CACHE_CAPACITY,
            store_name: DEFAULT_STORE_NAME.to_string(),
            event_buffer_size: 100,
        }
    }
}

impl LoaderConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the freshness TTL fallback.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the buffer cache capacity (entries).
    pub fn with_buffer_cache_capacity(mut self, capacity: usize) -> Self {
        self.buffer_cache_capacity = capacity;
        self
    }

    /// Set the persistent store namespace name.
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Set the event bus buffer size.
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_cache_capacity == 0 {
            return Err(Error::Config(
                "buffer_cache_capacity must be at least 1".to_string(),
            ));
        }

        if self.cache_ttl.is_zero() {
            return Err(Error::Config("cache_ttl must be non-zero".to_string()));
        }

        if self.store_name.is_empty() {
            return Err(Error::Config("store_name cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
