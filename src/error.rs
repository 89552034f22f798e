//! Custom error types for the search pipeline.
//!
//! Every pipeline stage owns a small error enum, and `SearchError` consolidates
//! them so a request handler can propagate any stage failure with `?`.
//!
//! ## Error Hierarchy
//!
//! - **`Validation`**: bad filter tokens supplied by the client. Recoverable; the
//!   message is Portuguese and names the offending parameter and value.
//! - **`Query`**: the metadata index could not be read.
//! - **`Retrieval`**: the batched blob fetch failed. No partial data is ever
//!   returned when this happens.
//! - **`Decode`**: an archive or its CSV entry is malformed. Archives are produced
//!   by the ingestion pipeline, so this points at an upstream bug rather than at
//!   the client.
//!
//! The HTTP layer maps these onto status codes in one place
//! (`server::error_mapping`).

use thiserror::Error;

/// Convenience alias for results using the pipeline error type.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Top-level error returned by the search pipeline.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Filter parameters failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Metadata index read failed.
    #[error("metadata index query failed: {0}")]
    Query(#[from] QueryError),

    /// Archive batch fetch failed.
    #[error("archive retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Archive or CSV decoding failed.
    #[error("archive decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl SearchError {
    /// Short machine-readable kind, used for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Validation(_) => "validation",
            SearchError::Query(_) => "query",
            SearchError::Retrieval(_) => "retrieval",
            SearchError::Decode(_) => "decode",
        }
    }
}

/// Client-supplied filter was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A token could not be interpreted for the named parameter.
    #[error("parâmetro {label} '{token}' é inválido!")]
    InvalidParameter {
        /// Query parameter name (`anos`, `meses`).
        field: &'static str,
        /// Human-readable parameter label used in the message.
        label: &'static str,
        /// The rejected token, verbatim.
        token: String,
    },
}

impl ValidationError {
    /// Query parameter that carried the bad token.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidParameter { field, .. } => field,
        }
    }
}

/// Failure reading the metadata index.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Driver-level failure (connection, SQL, row mapping).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-SQL index implementation.
    #[error("{0}")]
    Backend(String),
}

/// Failure fetching archives from the blob store.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The object store reported an error for one archive.
    #[error("failed to fetch '{location}': {source}")]
    Object {
        /// Object key that failed.
        location: String,
        /// Underlying store error.
        #[source]
        source: object_store::Error,
    },

    /// The batch did not complete within the configured timeout.
    #[error("batch fetch of {archives} archive(s) timed out after {seconds}s")]
    Timeout {
        /// Number of archives in the batch.
        archives: usize,
        /// Configured timeout.
        seconds: u64,
    },

    /// Failure reported by a non-object_store implementation.
    #[error("failed to fetch '{location}': {reason}")]
    Backend {
        /// Object key that failed.
        location: String,
        /// Backend-provided reason.
        reason: String,
    },

    /// Blob store could not be constructed from configuration.
    #[error("blob store configuration error: {0}")]
    Configuration(String),
}

/// Failure decoding an archive buffer.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Buffer is not a readable zip archive.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Archive does not hold exactly one entry.
    #[error("archive must contain exactly one entry, found {0}")]
    EntryCount(usize),

    /// A CSV row could not be decoded.
    #[error("malformed row: {0}")]
    Row(#[from] csv::Error),

    /// Decode task was cancelled or panicked.
    #[error("decode task failed: {0}")]
    Task(String),
}
