//! Local directory backend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::blobstore::Blobstore;
use crate::error::{Error, Result};

/// Blob storage in a local directory: one file per key.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a crash mid-write never leaves a truncated dayfile behind.
#[derive(Debug, Clone)]
pub struct FsBlobstore {
    root: PathBuf,
}

impl FsBlobstore {
    /// Create a backend rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains('/')
            || key.contains('\\')
        {
            return Err(Error::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Blobstore for FsBlobstore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Bytes::from(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(Error::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        let path = self.path_for(key)?;
        let io_err = |source| Error::Io {
            key: key.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.root).await.map_err(io_err)?;

        let tmp = self.root.join(format!(".{key}.tmp"));
        tokio::fs::write(&tmp, &body).await.map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            // Keep the rename error, not any cleanup failure
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }

        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path).await.map_err(|e| Error::Io {
            key: key.to_string(),
            source: e,
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
