use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreError;

/// Storage for uploaded post images, addressed by their download URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Removes the blob. A blob that is already gone is not an error.
    async fn delete(&self, url: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashSet<String>>>,
    failing: Arc<RwLock<bool>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, url: impl Into<String>) {
        self.blobs.write().await.insert(url.into());
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.blobs.read().await.contains(url)
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        if *self.failing.read().await {
            return Err(StoreError::Unavailable {
                reason: format!("blob storage rejected delete of '{}'", url),
            });
        }
        self.blobs.write().await.remove(url);
        Ok(())
    }
}
