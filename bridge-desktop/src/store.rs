//! Filesystem-backed Byte Store
//!
//! Stores each named store as a directory and each key as a file named by
//! the sha256 hex digest of the key, so arbitrary keys (URLs) map to safe
//! filenames. Content headers, when supplied, are written to a JSON
//! sidecar next to the body file.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    store::{ByteStore, ContentHeaders, StoreHandle},
};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Filesystem byte store rooted at a base directory.
pub struct FsByteStore {
    base_dir: PathBuf,
}

impl FsByteStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl ByteStore for FsByteStore {
    async fn open(&self, name: &str) -> Result<Arc<dyn StoreHandle>> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid store name: {:?}",
                name
            )));
        }

        let dir = self.base_dir.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        debug!(store = name, dir = %dir.display(), "Opened byte store");

        Ok(Arc::new(FsStoreHandle { dir }))
    }
}

/// Handle to one store directory.
struct FsStoreHandle {
    dir: PathBuf,
}

impl FsStoreHandle {
    fn body_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(format!("{:x}", hasher.finalize()))
    }

    fn headers_path(&self, key: &str) -> PathBuf {
        let mut path = self.body_path(key);
        path.set_extension("headers");
        path
    }
}

#[async_trait]
impl StoreHandle for FsStoreHandle {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match tokio::fs::read(self.body_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn put(&self, key: &str, data: Bytes, headers: &ContentHeaders) -> Result<()> {
        tokio::fs::write(self.body_path(key), &data).await?;

        if !headers.is_empty() {
            let json = serde_json::to_vec(headers)
                .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
            tokio::fs::write(self.headers_path(key), json).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let existed = match tokio::fs::remove_file(self.body_path(key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(BridgeError::Io(e)),
        };

        if let Err(e) = tokio::fs::remove_file(self.headers_path(key)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(key, error = %e, "Failed to remove header sidecar");
            }
        }

        Ok(existed)
    }
}
