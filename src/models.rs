//! Records flowing through the search pipeline.
//!
//! `CandidateRecord` is one row of the metadata index (read-only here),
//! `PayRow` is one decoded line of an archived CSV, and `SearchResponse` is the
//! JSON body of the preview endpoint. Wire names are Portuguese because the
//! archives and the public API already use them.

use serde::{Deserialize, Serialize};

use crate::search::filter::Category;

/// One metadata index entry: row counts per category and where the archive lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CandidateRecord {
    /// Agency identifier, e.g. `tjal`.
    #[sqlx(rename = "orgao")]
    pub agency: String,
    /// Reference year.
    #[sqlx(rename = "ano")]
    pub year: i32,
    /// Reference month (1-12).
    #[sqlx(rename = "mes")]
    pub month: i32,
    /// Number of `base` rows in the archive.
    #[sqlx(rename = "base")]
    pub row_count_base: i32,
    /// Number of `outras` rows in the archive.
    #[sqlx(rename = "outras")]
    pub row_count_other: i32,
    /// Number of `descontos` rows in the archive.
    #[sqlx(rename = "descontos")]
    pub row_count_discount: i32,
    /// Public URL of the zipped CSV.
    #[sqlx(rename = "zip_url")]
    pub archive_url: String,
}

impl CandidateRecord {
    /// Rows in this archive that match `category`.
    ///
    /// Negative counters (never produced upstream) count as zero.
    pub fn matching_rows(&self, category: Category) -> u64 {
        let count = |n: i32| u64::try_from(n).unwrap_or(0);
        match category {
            Category::Base => count(self.row_count_base),
            Category::Other => count(self.row_count_other),
            Category::Discount => count(self.row_count_discount),
            Category::Unrecognized => 0,
            Category::All => {
                count(self.row_count_base)
                    + count(self.row_count_other)
                    + count(self.row_count_discount)
            }
        }
    }
}

/// Column names of an archived CSV, in file order. Downloads reuse them.
pub const CSV_HEADER: [&str; 10] = [
    "orgao",
    "mes",
    "ano",
    "matricula",
    "nome",
    "cargo",
    "lotacao",
    "categoria_contracheque",
    "detalhamento_contracheque",
    "valor",
];

/// One payroll line item decoded from an archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayRow {
    /// Agency identifier.
    #[serde(rename = "orgao")]
    pub agency: String,
    /// Reference month.
    #[serde(rename = "mes")]
    pub month: i32,
    /// Reference year.
    #[serde(rename = "ano")]
    pub year: i32,
    /// Employee registration number, when published.
    #[serde(rename = "matricula")]
    pub registration: Option<String>,
    /// Employee name.
    #[serde(rename = "nome")]
    pub name: String,
    /// Role, when published.
    #[serde(rename = "cargo")]
    pub role: Option<String>,
    /// Workplace, when published.
    #[serde(rename = "lotacao")]
    pub workplace: Option<String>,
    /// `base`, `outras` or `descontos`.
    #[serde(rename = "categoria_contracheque")]
    pub category_label: String,
    /// Free-text description of the line item.
    #[serde(rename = "detalhamento_contracheque")]
    pub line_item_label: String,
    /// Amount in BRL.
    #[serde(rename = "valor", serialize_with = "serialize_amount")]
    pub amount: f64,
}

/// Writes whole amounts without a fractional part (`1000`, not `1000.0`).
fn serialize_amount<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    // Largest magnitude below which every whole f64 is an exact i64.
    const EXACT_WHOLE: f64 = 9_007_199_254_740_992.0;
    if amount.fract() == 0.0 && amount.abs() < EXACT_WHOLE {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}

/// The two caller-facing row caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Rows returned by a preview.
    pub search_limit: usize,
    /// Rows returned by a download; also the fetch budget for every request.
    pub download_limit: usize,
}

/// Body of the preview endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Whether the full result fits in one download.
    pub download_available: bool,
    /// Total rows matching the filter across every candidate archive.
    pub num_rows_if_available: u64,
    /// Preview cap.
    pub search_limit: usize,
    /// Download cap.
    pub download_limit: usize,
    /// First `search_limit` matching rows.
    pub result: Vec<PayRow>,
}

impl SearchResponse {
    /// Assemble a preview response.
    pub fn new(result: Vec<PayRow>, total_matching_rows: u64, limits: Limits) -> Self {
        let download_limit = u64::try_from(limits.download_limit).unwrap_or(u64::MAX);
        Self {
            download_available: total_matching_rows > 0 && total_matching_rows <= download_limit,
            num_rows_if_available: total_matching_rows,
            search_limit: limits.search_limit,
            download_limit: limits.download_limit,
            result,
        }
    }
}
