//! Metadata index access.
//!
//! The index maps (agency, year, month) to per-category row counts and the
//! archive URL. This pipeline only reads it, through a single parameterized
//! query built by `search::query`.

pub mod postgres;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::models::CandidateRecord;
use crate::search::query::BuiltQuery;

pub use postgres::PostgresIndex;

/// Read access to the metadata index.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Run `query` and return every matching candidate, in index order.
    async fn query(&self, query: &BuiltQuery) -> Result<Vec<CandidateRecord>, QueryError>;
}
