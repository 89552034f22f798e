//! Shared fixtures for integration tests: in-memory index, recording blob
//! store and zip archive builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use payroll_search::blob::{ArchiveLocation, BatchRetriever, BlobStore, RetrievalSettings};
use payroll_search::error::{QueryError, RetrievalError};
use payroll_search::index::MetadataIndex;
use payroll_search::models::{CandidateRecord, Limits, PayRow, CSV_HEADER};
use payroll_search::search::{ArchiveFormat, BuiltQuery, SearchPipeline};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const BUCKET: &str = "dadosjusbr";

/// Index that returns fixed candidates and remembers every query.
pub struct StaticIndex {
    pub candidates: Vec<CandidateRecord>,
    pub queries: Mutex<Vec<BuiltQuery>>,
    pub fail: bool,
}

impl StaticIndex {
    pub fn new(candidates: Vec<CandidateRecord>) -> Self {
        Self {
            candidates,
            queries: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl MetadataIndex for StaticIndex {
    async fn query(&self, query: &BuiltQuery) -> Result<Vec<CandidateRecord>, QueryError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(QueryError::Backend(format!("relation missing: {}", query.sql)));
        }
        Ok(self.candidates.clone())
    }
}

/// Blob store over a map that records every requested key.
#[derive(Default)]
pub struct RecordingStore {
    pub objects: HashMap<String, Bytes>,
    pub requested: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn with(mut self, key: &str, body: Bytes) -> Self {
        self.objects.insert(key.to_string(), body);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
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
                reason: "no such key".into(),
            })
    }
}

pub fn key(agency: &str, year: i32, month: i32) -> String {
    format!("{agency}/{year}/{month}.zip")
}

pub fn candidate(
    agency: &str,
    year: i32,
    month: i32,
    counts: (i32, i32, i32),
) -> CandidateRecord {
    CandidateRecord {
        agency: agency.into(),
        year,
        month,
        row_count_base: counts.0,
        row_count_other: counts.1,
        row_count_discount: counts.2,
        archive_url: format!(
            "https://{BUCKET}.s3.amazonaws.com/{}",
            key(agency, year, month)
        ),
    }
}

pub fn pay_row(agency: &str, year: i32, month: i32, name: &str, category: &str) -> PayRow {
    PayRow {
        agency: agency.into(),
        month,
        year,
        registration: None,
        name: name.into(),
        role: Some("Servidor".into()),
        workplace: Some("Maceió".into()),
        category_label: category.into(),
        line_item_label: "Remuneração".into(),
        amount: 100.0,
    }
}

/// `n` rows of `category` for one archive, named `{agency}-{month}-{i}`.
pub fn rows_of(agency: &str, year: i32, month: i32, category: &str, n: usize) -> Vec<PayRow> {
    (0..n)
        .map(|i| pay_row(agency, year, month, &format!("{agency}-{month}-{i}"), category))
        .collect()
}

/// A single-entry zip holding `rows` as CSV in `format`.
pub fn archive(rows: &[PayRow], format: ArchiveFormat) -> Bytes {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER).unwrap();
    for row in rows {
        writer.serialize(row).unwrap();
    }
    let body = writer.into_inner().unwrap();

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    zip.start_file("remuneracoes.csv", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(&body).unwrap();
    Bytes::from(zip.finish().unwrap().into_inner())
}

pub fn pipeline(
    index: Arc<StaticIndex>,
    store: Arc<RecordingStore>,
    limits: Limits,
) -> SearchPipeline {
    let retriever = BatchRetriever::new(store, BUCKET, RetrievalSettings::default());
    SearchPipeline::new(index, retriever, limits)
}
