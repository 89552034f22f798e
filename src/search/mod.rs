//! The search and bulk-retrieval pipeline.
//!
//! A request flows through these stages, each in its own module:
//!
//! 1. [`filter`]: parse and validate the raw query parameters
//! 2. [`query`]: turn the filter into one parameterized index query
//! 3. [`order`]: sort candidates chronologically
//! 4. [`plan`]: pick the archives worth fetching under the download budget
//! 5. `blob::BatchRetriever`: fetch the selected archives concurrently
//! 6. [`decode`] and [`accumulate`]: stream rows out of each archive until the
//!    cap is reached
//!
//! [`pipeline::SearchPipeline`] drives the stages for the preview and download
//! endpoints.

pub mod accumulate;
pub mod decode;
pub mod filter;
pub mod order;
pub mod pipeline;
pub mod plan;
pub mod query;

pub use decode::ArchiveFormat;
pub use filter::{parse_filter, Category, Filter};
pub use pipeline::{PreviewResult, SearchPipeline};
pub use plan::RetrievalPlan;
pub use query::{build_query, BuiltQuery, QueryArg};
