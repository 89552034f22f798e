//! # Payroll Search Library
//!
//! Budget-aware search and bulk retrieval over archived public-sector payroll
//! data. A metadata index lists one zipped CSV per (agency, year, month); this
//! crate turns a user filter into the smallest set of archive fetches that can
//! answer it, then streams matching rows out of those archives up to a cap.
//!
//! ## Crate Structure
//!
//! - **`search`**: the request pipeline (filter, query builder, ordering, budget
//!   planning, archive decoding, accumulation) and `SearchPipeline`, which drives it.
//! - **`index`**: the `MetadataIndex` trait and its Postgres implementation.
//! - **`blob`**: the `BlobStore` trait, the `object_store`-backed client and the
//!   concurrent `BatchRetriever`.
//! - **`server`**: axum routes for preview, download and health, plus the single
//!   error-to-status mapping.
//! - **`models`**: index records, decoded rows and the preview response body.
//! - **`config`**: layered TOML + environment configuration. See `config::SearchConfig`.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: the per-stage error enums and `SearchError`.
//! - **`validation`**: small validators used by configuration checks.

pub mod blob;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod models;
pub mod search;
pub mod server;
pub mod validation;
