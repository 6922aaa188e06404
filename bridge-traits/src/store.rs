//! Persistent Byte Store Abstraction
//!
//! Provides a platform-agnostic named key/value byte store used for the
//! persistent tier of the resource cache.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

/// Content headers attached to a stored body (e.g. `content-type`).
///
/// Stores may persist these alongside the bytes or ignore them; they are
/// advisory and never required to reconstruct the payload.
pub type ContentHeaders = HashMap<String, String>;

/// A named key/value byte store.
///
/// `open` returns a handle scoped to one named store; distinct names are
/// fully independent namespaces. Implementations back this with whatever
/// the platform offers (filesystem directory, embedded KV database, ...).
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Open (creating if necessary) the store with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage is unavailable in the
    /// current environment or the store cannot be created.
    async fn open(&self, name: &str) -> Result<Arc<dyn StoreHandle>>;
}

/// Handle to one named store.
///
/// Keys are opaque strings. Values are raw bytes; callers layer their own
/// record formats (e.g. JSON side-records) on top.
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Retrieve the bytes stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `data` under `key`, replacing any previous value.
    async fn put(&self, key: &str, data: Bytes, headers: &ContentHeaders) -> Result<()>;

    /// Remove the entry under `key`. Returns whether an entry existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}
