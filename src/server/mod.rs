//! HTTP surface: preview and download endpoints.
//!
//! `/uiapi/v2/*` serves current (semicolon) archives and `/uiapi/v1/*` serves
//! legacy (comma) archives. Both take the same query parameters:
//! `anos`, `meses`, `orgaos`, `categorias`, `tipos`.

pub mod error_mapping;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Query, State};
use axum::http::{header, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::SearchError;
use crate::models::{PayRow, SearchResponse, CSV_HEADER};
use crate::search::{parse_filter, ArchiveFormat, Filter, SearchPipeline};

pub use error_mapping::{map_search_error, ApiError, ApiErrorBody};

/// Liveness probe.
pub const HEALTHZ_PATH: &str = "/healthz";
/// Preview over current archives.
pub const V2_SEARCH_PATH: &str = "/uiapi/v2/pesquisar";
/// Download over current archives.
pub const V2_DOWNLOAD_PATH: &str = "/uiapi/v2/download";
/// Preview over legacy archives.
pub const V1_SEARCH_PATH: &str = "/uiapi/v1/pesquisar";
/// Download over legacy archives.
pub const V1_DOWNLOAD_PATH: &str = "/uiapi/v1/download";

const DOWNLOAD_DISPOSITION: &str = "attachment; filename=dadosjusbr-remuneracoes.csv";
const CSV_CONTENT_TYPE: &str = "text/csv";

/// Failures starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `listen_addr` did not parse.
    #[error("invalid listen address `{address}`: {source}")]
    InvalidListenAddr {
        /// The configured value.
        address: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },
    /// The socket could not be bound.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        /// Address we tried to bind.
        address: String,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The server loop failed.
    #[error("axum server error: {source}")]
    Serve {
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Raw filter parameters. Missing parameters are empty, i.e. unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Comma-separated years.
    pub anos: String,
    /// Comma-separated months.
    pub meses: String,
    /// Comma-separated agency identifiers.
    pub orgaos: String,
    /// Category token.
    pub categorias: String,
    /// Accepted and ignored.
    pub tipos: String,
}

impl SearchParams {
    /// Collect the filter parameters from raw query pairs.
    ///
    /// The first occurrence of a repeated key wins and unknown keys are
    /// ignored, so no query string is rejected at this stage.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs.into_iter().rev() {
            let slot = match key.as_str() {
                "anos" => &mut params.anos,
                "meses" => &mut params.meses,
                "orgaos" => &mut params.orgaos,
                "categorias" => &mut params.categorias,
                "tipos" => &mut params.tipos,
                _ => continue,
            };
            *slot = value;
        }
        params
    }

    fn filter(&self) -> Result<Option<Filter>, SearchError> {
        Ok(parse_filter(
            &self.anos,
            &self.meses,
            &self.orgaos,
            &self.categorias,
            &self.tipos,
        )?)
    }
}

#[derive(Debug, Serialize)]
struct HealthzResponse {
    status: &'static str,
}

type AppState = Arc<SearchPipeline>;

/// Build the application router.
pub fn router(pipeline: SearchPipeline, request_timeout: Duration) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        let path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        tracing::info_span!("http.request", method = %request.method(), path = %path)
    });

    Router::new()
        .route(HEALTHZ_PATH, get(healthz))
        .route(V2_SEARCH_PATH, get(search_current))
        .route(V2_DOWNLOAD_PATH, get(download_current))
        .route(V1_SEARCH_PATH, get(search_legacy))
        .route(V1_DOWNLOAD_PATH, get(download_legacy))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(trace_layer)
        .with_state(Arc::new(pipeline))
}

/// Bind `config.listen_addr` and serve until `shutdown` resolves.
pub async fn serve(
    config: &ServerConfig,
    pipeline: SearchPipeline,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr: SocketAddr =
        config
            .listen_addr
            .trim()
            .parse()
            .map_err(|source| ServerError::InvalidListenAddr {
                address: config.listen_addr.clone(),
                source,
            })?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            address: addr.to_string(),
            source,
        })?;
    tracing::info!(%addr, "payroll search listening");

    let app = router(pipeline, Duration::from_secs(config.request_timeout_secs));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| ServerError::Serve { source })?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to capture Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to capture SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received; draining connections"),
        _ = sigterm => tracing::info!("SIGTERM received; draining connections"),
    }
}

async fn healthz() -> impl IntoResponse {
    Json(HealthzResponse { status: "ok" })
}

async fn search_current(
    State(pipeline): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    search(&pipeline, &SearchParams::from_pairs(pairs), ArchiveFormat::Current).await
}

async fn search_legacy(
    State(pipeline): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    search(&pipeline, &SearchParams::from_pairs(pairs), ArchiveFormat::Legacy).await
}

async fn download_current(
    State(pipeline): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    download(&pipeline, &SearchParams::from_pairs(pairs), ArchiveFormat::Current).await
}

async fn download_legacy(
    State(pipeline): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    download(&pipeline, &SearchParams::from_pairs(pairs), ArchiveFormat::Legacy).await
}

async fn search(
    pipeline: &SearchPipeline,
    params: &SearchParams,
    format: ArchiveFormat,
) -> Result<Json<SearchResponse>, ApiError> {
    let filter = params.filter()?;
    let preview = pipeline.preview(filter.as_ref(), format).await?;
    Ok(Json(SearchResponse::new(
        preview.rows,
        preview.total_matching_rows,
        pipeline.limits(),
    )))
}

async fn download(
    pipeline: &SearchPipeline,
    params: &SearchParams,
    format: ArchiveFormat,
) -> Result<Response, ApiError> {
    let filter = params.filter()?;
    let rows = pipeline.download(filter.as_ref(), format).await?;
    let body = encode_csv(&rows).map_err(|e| ApiError::internal("encode", &e))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(CSV_CONTENT_TYPE)),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static(DOWNLOAD_DISPOSITION),
            ),
        ],
        body,
    )
        .into_response())
}

/// Render rows as a comma-separated CSV with a header line.
fn encode_csv(rows: &[PayRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
