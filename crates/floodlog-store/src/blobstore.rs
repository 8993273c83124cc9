//! Key/value storage abstraction.
//!
//! This module provides the [`Blobstore`] trait that abstracts over a local
//! directory and a cloud object store. Keys are dayfile names such as
//! `2024-01-02.json`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Trait abstracting blob storage for dayfiles.
///
/// Implementations must report a missing key as
/// [`Error::NotFound`](crate::Error::NotFound) so callers can tell "no
/// dayfile yet" apart from a failing backend.
#[async_trait]
pub trait Blobstore: Send + Sync {
    /// Fetch the blob stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Store `body` under `key`, replacing any previous blob.
    async fn put(&self, key: &str, body: Bytes) -> Result<()>;

    /// Check whether a blob exists under `key`.
    ///
    /// The default implementation fetches the blob; backends with a cheaper
    /// existence check should override it.
    async fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Human-readable location, used in log messages.
    fn describe(&self) -> String;
}

#[async_trait]
impl<B: Blobstore + ?Sized> Blobstore for Arc<B> {
    async fn get(&self, key: &str) -> Result<Bytes> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        (**self).put(key, body).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[async_trait]
impl<B: Blobstore + ?Sized> Blobstore for Box<B> {
    async fn get(&self, key: &str) -> Result<Bytes> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        (**self).put(key, body).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
