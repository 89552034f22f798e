//! Postgres-backed metadata index.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;
use crate::error::QueryError;
use crate::models::CandidateRecord;
use crate::search::query::{BuiltQuery, QueryArg};

use super::MetadataIndex;

/// Metadata index over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PostgresIndex {
    pool: PgPool,
}

impl PostgresIndex {
    /// Open a pool and verify connectivity.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, QueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        info!(max_connections = config.max_connections, "metadata index connected");
        Ok(Self { pool })
    }
}

#[async_trait]
impl MetadataIndex for PostgresIndex {
    #[instrument(skip_all, fields(args = query.args.len()))]
    async fn query(&self, query: &BuiltQuery) -> Result<Vec<CandidateRecord>, QueryError> {
        let mut statement = sqlx::query_as::<_, CandidateRecord>(&query.sql);
        for arg in &query.args {
            statement = match arg {
                QueryArg::Int(value) => statement.bind(*value),
                QueryArg::Text(value) => statement.bind(value.clone()),
            };
        }
        let rows = statement.fetch_all(&self.pool).await?;
        debug!(candidates = rows.len(), "metadata index read");
        Ok(rows)
    }
}
