//! Request orchestration for preview and download.
//!
//! Both entry points run the same stages and differ only in the row cap:
//! previews stop at `search_limit`, downloads at `download_limit`. The fetch
//! budget is always `download_limit`, so a preview reports the same total a
//! download would see.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::blob::BatchRetriever;
use crate::error::{DecodeError, SearchResult};
use crate::index::MetadataIndex;
use crate::models::{Limits, PayRow};

use super::accumulate::accumulate;
use super::decode::ArchiveFormat;
use super::filter::{category_of, Filter};
use super::order::order_candidates;
use super::plan::plan;
use super::query::build_query;

/// Outcome of a preview request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewResult {
    /// First `search_limit` matching rows.
    pub rows: Vec<PayRow>,
    /// Rows matching the filter across every candidate archive.
    pub total_matching_rows: u64,
}

/// Entry point shared by every request.
///
/// Holds only long-lived clients; all per-request state lives on the stack
/// of [`SearchPipeline::preview`] and [`SearchPipeline::download`].
#[derive(Clone)]
pub struct SearchPipeline {
    index: Arc<dyn MetadataIndex>,
    retriever: BatchRetriever,
    limits: Limits,
}

impl std::fmt::Debug for SearchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPipeline")
            .field("retriever", &self.retriever)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl SearchPipeline {
    /// Wire the pipeline to its index and blob retriever.
    pub fn new(index: Arc<dyn MetadataIndex>, retriever: BatchRetriever, limits: Limits) -> Self {
        Self {
            index,
            retriever,
            limits,
        }
    }

    /// The configured caps.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Up to `search_limit` rows plus the total match count.
    #[instrument(skip_all, fields(format = ?format))]
    pub async fn preview(
        &self,
        filter: Option<&Filter>,
        format: ArchiveFormat,
    ) -> SearchResult<PreviewResult> {
        let (rows, total_matching_rows) =
            self.run(filter, format, self.limits.search_limit).await?;
        Ok(PreviewResult {
            rows,
            total_matching_rows,
        })
    }

    /// Up to `download_limit` rows.
    #[instrument(skip_all, fields(format = ?format))]
    pub async fn download(
        &self,
        filter: Option<&Filter>,
        format: ArchiveFormat,
    ) -> SearchResult<Vec<PayRow>> {
        let (rows, _) = self.run(filter, format, self.limits.download_limit).await?;
        Ok(rows)
    }

    async fn run(
        &self,
        filter: Option<&Filter>,
        format: ArchiveFormat,
        cap: usize,
    ) -> SearchResult<(Vec<PayRow>, u64)> {
        let category = category_of(filter);
        let query = build_query(filter);
        debug!(sql = %query.sql, args = query.args.len(), "querying metadata index");

        let mut candidates = self.index.query(&query).await?;
        order_candidates(&mut candidates);
        let candidate_count = candidates.len();

        let budget = u64::try_from(self.limits.download_limit).unwrap_or(u64::MAX);
        let plan = plan(candidates, category, budget);
        info!(
            candidates = candidate_count,
            selected = plan.selected.len(),
            total_matching_rows = plan.total_matching_rows,
            within_budget = plan.within_budget(),
            "retrieval planned"
        );
        if plan.is_empty() || plan.total_matching_rows == 0 {
            return Ok((Vec::new(), plan.total_matching_rows));
        }

        let buffers = self.retriever.fetch_all(&plan.selected).await?;

        let rows = tokio::task::spawn_blocking(move || accumulate(buffers, format, category, cap))
            .await
            .map_err(|e| DecodeError::Task(e.to_string()))??;
        info!(rows = rows.len(), cap, "rows accumulated");

        Ok((rows, plan.total_matching_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{ArchiveLocation, BlobStore, RetrievalSettings};
    use crate::error::{QueryError, RetrievalError, SearchError};
    use crate::models::CandidateRecord;
    use crate::search::decode::fixtures::{archive, row};
    use crate::search::filter::parse_filter;
    use crate::search::query::BuiltQuery;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const FORMAT: ArchiveFormat = ArchiveFormat::Current;

    struct FixedIndex {
        candidates: Vec<CandidateRecord>,
    }

    #[async_trait]
    impl MetadataIndex for FixedIndex {
        async fn query(&self, _query: &BuiltQuery) -> Result<Vec<CandidateRecord>, QueryError> {
            Ok(self.candidates.clone())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        objects: HashMap<String, Bytes>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for RecordingStore {
        async fn fetch(&self, location: &ArchiveLocation) -> Result<Bytes, RetrievalError> {
            self.requested
                .lock()
                .unwrap()
                .push(location.as_str().to_string());
            self.objects
                .get(location.as_str())
                .cloned()
                .ok_or_else(|| RetrievalError::Backend {
                    location: location.to_string(),
                    reason: "not found".into(),
                })
        }
    }

    fn candidate(agency: &str, year: i32, month: i32, base: i32) -> CandidateRecord {
        CandidateRecord {
            agency: agency.into(),
            year,
            month,
            row_count_base: base,
            row_count_other: 0,
            row_count_discount: 0,
            archive_url: format!("{agency}/{year}/{month}.zip"),
        }
    }

    fn base_rows(agency: &str, n: usize) -> Vec<PayRow> {
        (0..n)
            .map(|i| row(agency, &format!("{agency}-{i}"), "base", 1.0))
            .collect()
    }

    fn pipeline(
        candidates: Vec<CandidateRecord>,
        store: RecordingStore,
        limits: Limits,
    ) -> (SearchPipeline, Arc<RecordingStore>) {
        let store = Arc::new(store);
        let index = Arc::new(FixedIndex { candidates });
        let retriever = BatchRetriever::new(store.clone(), "bucket", RetrievalSettings::default());
        (SearchPipeline::new(index, retriever, limits), store)
    }

    #[tokio::test]
    async fn preview_caps_rows_and_reports_full_total() {
        let mut store = RecordingStore::default();
        store
            .objects
            .insert("tjal/2020/1.zip".into(), archive(&base_rows("tjal", 3), FORMAT));
        store
            .objects
            .insert("tjba/2020/1.zip".into(), archive(&base_rows("tjba", 3), FORMAT));
        let limits = Limits {
            search_limit: 4,
            download_limit: 100,
        };
        let (pipeline, _) = pipeline(
            vec![candidate("tjal", 2020, 1, 3), candidate("tjba", 2020, 1, 3)],
            store,
            limits,
        );

        let preview = pipeline.preview(None, FORMAT).await.unwrap();
        assert_eq!(preview.rows.len(), 4);
        assert_eq!(preview.total_matching_rows, 6);
        assert_eq!(preview.rows[3].agency, "tjba");
    }

    #[tokio::test]
    async fn archives_past_the_budget_are_never_fetched() {
        let mut store = RecordingStore::default();
        for (agency, month) in [("tjal", 1), ("tjal", 2), ("tjal", 3)] {
            store.objects.insert(
                format!("{agency}/2020/{month}.zip"),
                archive(&base_rows(agency, 5), FORMAT),
            );
        }
        let limits = Limits {
            search_limit: 2,
            download_limit: 6,
        };
        let (pipeline, store) = pipeline(
            vec![
                candidate("tjal", 2020, 3, 5),
                candidate("tjal", 2020, 1, 5),
                candidate("tjal", 2020, 2, 5),
            ],
            store,
            limits,
        );

        let rows = pipeline.download(None, FORMAT).await.unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(
            *store.requested.lock().unwrap(),
            vec!["tjal/2020/1.zip".to_string(), "tjal/2020/2.zip".to_string()]
        );
    }

    #[tokio::test]
    async fn no_candidates_means_no_fetch() {
        let limits = Limits {
            search_limit: 10,
            download_limit: 10,
        };
        let (pipeline, store) = pipeline(Vec::new(), RecordingStore::default(), limits);

        let preview = pipeline.preview(None, FORMAT).await.unwrap();
        assert!(preview.rows.is_empty());
        assert_eq!(preview.total_matching_rows, 0);
        assert!(store.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_filter_drops_other_rows() {
        let rows = vec![
            row("tjal", "Ana", "base", 1.0),
            row("tjal", "Ana", "descontos", -1.0),
            row("tjal", "Bia", "outras", 2.0),
        ];
        let mut store = RecordingStore::default();
        store
            .objects
            .insert("tjal/2020/1.zip".into(), archive(&rows, FORMAT));
        let mut record = candidate("tjal", 2020, 1, 1);
        record.row_count_other = 1;
        record.row_count_discount = 1;
        let limits = Limits {
            search_limit: 10,
            download_limit: 10,
        };
        let (pipeline, _) = pipeline(vec![record], store, limits);
        let filter = parse_filter("", "", "", "descontos", "").unwrap();

        let preview = pipeline.preview(filter.as_ref(), FORMAT).await.unwrap();
        assert_eq!(preview.total_matching_rows, 1);
        assert_eq!(preview.rows.len(), 1);
        assert_eq!(preview.rows[0].category_label, "descontos");
    }

    #[tokio::test]
    async fn unrecognized_category_returns_nothing_without_fetching() {
        let mut store = RecordingStore::default();
        store
            .objects
            .insert("tjal/2020/1.zip".into(), archive(&base_rows("tjal", 2), FORMAT));
        let limits = Limits {
            search_limit: 10,
            download_limit: 10,
        };
        let (pipeline, store) = pipeline(vec![candidate("tjal", 2020, 1, 2)], store, limits);
        let filter = parse_filter("", "", "", "Base", "").unwrap();

        let preview = pipeline.preview(filter.as_ref(), FORMAT).await.unwrap();
        assert!(preview.rows.is_empty());
        assert_eq!(preview.total_matching_rows, 0);
        assert!(store.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrieval_failure_surfaces_without_partial_rows() {
        let limits = Limits {
            search_limit: 10,
            download_limit: 10,
        };
        let (pipeline, _) = pipeline(
            vec![candidate("tjal", 2020, 1, 1)],
            RecordingStore::default(),
            limits,
        );

        let err = pipeline.download(None, FORMAT).await.unwrap_err();
        assert!(matches!(err, SearchError::Retrieval(_)));
    }
}
