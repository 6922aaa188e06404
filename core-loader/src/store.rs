//! # Persistent Store Adapter
//!
//! Wraps one opened [`StoreHandle`] and layers the cache's record format on
//! top: a resource's body lives under its key, the metadata side-record
//! under `key + ":meta"`, and the two are written and deleted as a pair.
//!
//! Store failures never propagate past this adapter as-is: reads degrade
//! to "absent" (a miss), writes roll the pair back and report a
//! [`LoaderError::Store`] the fetch pipeline catches locally.

use crate::error::{LoaderError, Result};
use crate::metadata::{meta_key, CacheMetadata};
use bridge_traits::store::{ContentHeaders, StoreHandle};
use bytes::Bytes;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pair-oriented view over one opened store.
///
/// Constructed with `None` when the store could not be opened; every read
/// then misses and every write fails locally, which degrades the load to a
/// plain fetch without failing it.
pub struct CacheStoreAdapter {
    handle: Option<Arc<dyn StoreHandle>>,
    events: Option<Arc<EventBus>>,
}

impl CacheStoreAdapter {
    pub fn new(handle: Option<Arc<dyn StoreHandle>>, events: Option<Arc<EventBus>>) -> Self {
        Self { handle, events }
    }

    /// Read the metadata side-record for `key`.
    ///
    /// A store failure or a record that no longer parses yields `None`; a
    /// corrupt record additionally deletes the pair so the next load starts
    /// from a clean slate.
    pub async fn read_metadata(&self, key: &str) -> Option<CacheMetadata> {
        let handle = self.handle.as_ref()?;

        let raw = match handle.get(&meta_key(key)).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Metadata read failed, treating as miss");
                self.emit_store_error(key, "read", &e.to_string());
                return None;
            }
        };

        match CacheMetadata::from_json(&raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(key, error = %e, "Corrupt metadata record, deleting pair");
                self.delete_pair(key).await;
                None
            }
        }
    }

    /// Read the stored body for `key`. Store failures degrade to `None`.
    pub async fn read_body(&self, key: &str) -> Option<Bytes> {
        let handle = self.handle.as_ref()?;
        match handle.get(key).await {
            Ok(body) => body,
            Err(e) => {
                warn!(key, error = %e, "Body read failed, treating as miss");
                self.emit_store_error(key, "read", &e.to_string());
                None
            }
        }
    }

    /// Write body and metadata as a pair.
    ///
    /// If either write fails the pair is deleted so no orphaned half-state
    /// survives, and the failure is returned for the caller to catch.
    pub async fn write_pair(
        &self,
        key: &str,
        body: Bytes,
        metadata: &CacheMetadata,
        content_headers: &ContentHeaders,
    ) -> Result<()> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| LoaderError::Store("store unavailable".to_string()))?;

        let record = metadata
            .to_json()
            .map_err(|e| LoaderError::Store(format!("metadata serialization failed: {e}")))?;

        let result: Result<()> = async {
            handle
                .put(key, body, content_headers)
                .await
                .map_err(|e| LoaderError::Store(e.to_string()))?;
            handle
                .put(&meta_key(key), Bytes::from(record), &ContentHeaders::new())
                .await
                .map_err(|e| LoaderError::Store(e.to_string()))?;
            Ok(())
        }
        .await;

        if let Err(e) = &result {
            warn!(key, error = %e, "Pair write failed, rolling back");
            self.emit_store_error(key, "write", &e.to_string());
            self.delete_pair(key).await;
        } else {
            debug!(key, "Stored body and metadata pair");
        }

        result
    }

    /// Replace only the metadata side-record.
    ///
    /// Used after a 304: the body is untouched, so a failure here leaves
    /// the previous pair intact and consistent. The caller logs and moves
    /// on.
    pub async fn replace_metadata(&self, key: &str, metadata: &CacheMetadata) -> Result<()> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| LoaderError::Store("store unavailable".to_string()))?;

        let record = metadata
            .to_json()
            .map_err(|e| LoaderError::Store(format!("metadata serialization failed: {e}")))?;

        handle
            .put(&meta_key(key), Bytes::from(record), &ContentHeaders::new())
            .await
            .map_err(|e| {
                self.emit_store_error(key, "write", &e.to_string());
                LoaderError::Store(e.to_string())
            })
    }

    /// Best-effort removal of both keys. Returns whether a body existed.
    pub async fn delete_pair(&self, key: &str) -> bool {
        let Some(handle) = self.handle.as_ref() else {
            return false;
        };

        let existed = match handle.delete(key).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(key, error = %e, "Body delete failed");
                self.emit_store_error(key, "delete", &e.to_string());
                false
            }
        };
        if let Err(e) = handle.delete(&meta_key(key)).await {
            warn!(key, error = %e, "Metadata delete failed");
            self.emit_store_error(key, "delete", &e.to_string());
        }
        existed
    }

    fn emit_store_error(&self, key: &str, operation: &str, message: &str) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Cache(CacheEvent::StoreError {
                key: key.to_string(),
                operation: operation.to_string(),
                message: message.to_string(),
            }))
            .ok();
        }
    }
}
