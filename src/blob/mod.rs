//! Archive retrieval from blob storage.
//!
//! `BlobStore` is the narrow seam to the storage client: fetch one object into
//! memory. `BatchRetriever` fans out one fetch per selected archive, bounded by
//! a configured concurrency, and fans the results back in plan order. Each
//! fetch owns its output slot; completion order never leaks into the result.
//!
//! A single failure aborts the whole batch. Dropping the returned future
//! cancels every fetch still in flight.

pub mod object;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crate::error::RetrievalError;
use crate::models::CandidateRecord;

pub use object::ObjectBlobStore;

/// Object key of one archive inside the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveLocation(String);

impl ArchiveLocation {
    /// Wrap an object key as-is.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the object key from a public archive URL.
    ///
    /// URLs of the form `https://<bucket>.s3.amazonaws.com/<key>` map to `<key>`;
    /// anything else is used verbatim.
    pub fn from_url(url: &str, bucket: &str) -> Self {
        let prefix = format!("https://{bucket}.s3.amazonaws.com/");
        Self(url.strip_prefix(&prefix).unwrap_or(url).to_string())
    }

    /// The object key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only access to archived objects.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch one object fully into memory.
    async fn fetch(&self, location: &ArchiveLocation) -> Result<Bytes, RetrievalError>;
}

/// Tuning for `BatchRetriever`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalSettings {
    /// Maximum concurrent fetches within one batch.
    pub concurrency: usize,
    /// Upper bound on a whole batch.
    pub timeout: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            concurrency: 16,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Fetches the archives chosen by the budget planner.
#[derive(Clone)]
pub struct BatchRetriever {
    store: Arc<dyn BlobStore>,
    bucket: String,
    settings: RetrievalSettings,
}

impl fmt::Debug for BatchRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRetriever")
            .field("bucket", &self.bucket)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BatchRetriever {
    /// Build a retriever over a long-lived store client.
    pub fn new(
        store: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            settings,
        }
    }

    /// Object key for a candidate's archive.
    pub fn location_of(&self, candidate: &CandidateRecord) -> ArchiveLocation {
        ArchiveLocation::from_url(&candidate.archive_url, &self.bucket)
    }

    /// Fetch every selected archive's raw zip bytes, preserving selection order.
    #[instrument(skip_all, fields(archives = selected.len()))]
    pub async fn fetch_all(
        &self,
        selected: &[CandidateRecord],
    ) -> Result<Vec<Bytes>, RetrievalError> {
        let locations: Vec<ArchiveLocation> =
            selected.iter().map(|c| self.location_of(c)).collect();
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let archives = locations.len();
        let concurrency = self.settings.concurrency.max(1);
        let batch = stream::iter(locations)
            .map(|location| async move {
                let buffer = self.store.fetch(&location).await?;
                debug!(%location, bytes = buffer.len(), "archive fetched");
                Ok::<_, RetrievalError>(buffer)
            })
            .buffered(concurrency)
            .try_collect::<Vec<_>>();

        tokio::time::timeout(self.settings.timeout, batch)
            .await
            .map_err(|_| RetrievalError::Timeout {
                archives,
                seconds: self.settings.timeout.as_secs(),
            })?
    }
}
