//! `object_store`-backed blob store (S3 or local filesystem).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::ObjectStore;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::RetrievalError;

use super::{ArchiveLocation, BlobStore};

/// Blob store over any `object_store` implementation.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectBlobStore {
    /// Wrap an existing object store client.
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// Build the client described by the storage configuration.
    ///
    /// S3 credentials are read from the standard `AWS_*` environment variables.
    pub fn from_config(config: &StorageConfig) -> Result<Self, RetrievalError> {
        let inner: Arc<dyn ObjectStore> = match config.backend {
            StorageBackend::S3 => Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(&config.bucket)
                    .with_region(&config.region)
                    .build()
                    .map_err(|e| RetrievalError::Configuration(e.to_string()))?,
            ),
            StorageBackend::Local => Arc::new(
                LocalFileSystem::new_with_prefix(&config.root)
                    .map_err(|e| RetrievalError::Configuration(e.to_string()))?,
            ),
        };
        info!(backend = ?config.backend, bucket = %config.bucket, "blob store ready");
        Ok(Self::new(inner))
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn fetch(&self, location: &ArchiveLocation) -> Result<Bytes, RetrievalError> {
        let path = Path::from(location.as_str());
        let wrap = |source| RetrievalError::Object {
            location: location.to_string(),
            source,
        };
        self.inner.get(&path).await.map_err(wrap)?.bytes().await.map_err(wrap)
    }
}
