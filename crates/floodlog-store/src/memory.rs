//! In-memory backend for testing and dry runs.
//!
//! The [`MemoryBlobstore`] keeps blobs in a map and supports failure
//! injection on writes, which lets tests check that a failed write surfaces
//! as an error instead of silently losing readings.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::blobstore::Blobstore;
use crate::error::{Error, Result};

/// Blob storage held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobstore {
    blobs: RwLock<BTreeMap<String, Bytes>>,
    put_count: AtomicU64,
    fail_puts: AtomicBool,
}

impl MemoryBlobstore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a blob directly, bypassing the put counter.
    pub async fn insert(&self, key: &str, body: impl Into<Bytes>) {
        self.blobs.write().await.insert(key.to_string(), body.into());
    }

    /// All stored keys in ascending order.
    pub async fn keys(&self) -> Vec<String> {
        self.blobs.read().await.keys().cloned().collect()
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> u64 {
        self.put_count.load(Ordering::Relaxed)
    }

    /// Make every subsequent `put` fail with a storage error.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl Blobstore for MemoryBlobstore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        if self.fail_puts.load(Ordering::Relaxed) {
            return Err(Error::Storage {
                key: key.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        self.blobs.write().await.insert(key.to_string(), body);
        self.put_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
