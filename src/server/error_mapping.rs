//! Mapping from `SearchError` to HTTP responses.
//!
//! Every handler funnels its failures through [`map_search_error`], so the
//! status code policy lives in one place:
//!
//! - **400 Bad Request**: validation errors. The body echoes the Portuguese
//!   message and names the offending parameter.
//! - **500 Internal Server Error**: index, retrieval and decode failures. The
//!   body is a fixed generic message; the detail (which may include SQL or
//!   archive keys) only goes to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::SearchError;

/// `error` code for rejected query parameters.
pub const ERROR_INVALID_PARAMETER: &str = "invalid_parameter";
/// `error` code for every server-side failure.
pub const ERROR_INTERNAL: &str = "internal_server_error";
/// Message returned to clients on server-side failures.
pub const INTERNAL_MESSAGE: &str = "Erro interno do servidor.";

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Query parameter at fault, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// An error ready to be rendered as a response.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    /// A 500 that logs `detail` and hides it from the client.
    pub fn internal(kind: &'static str, detail: &dyn std::fmt::Display) -> Self {
        tracing::error!(kind, error = %detail, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: internal_body(),
        }
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response body.
    pub fn body(&self) -> &ApiErrorBody {
        &self.body
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let (status, body) = map_search_error(&err);
        if status.is_server_error() {
            tracing::error!(kind = err.kind(), error = %err, "request failed");
        } else {
            tracing::debug!(kind = err.kind(), error = %err, "request rejected");
        }
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Map a pipeline error to its status code and client-facing body.
pub fn map_search_error(err: &SearchError) -> (StatusCode, ApiErrorBody) {
    match err {
        SearchError::Validation(e) => (
            StatusCode::BAD_REQUEST,
            ApiErrorBody {
                error: ERROR_INVALID_PARAMETER,
                message: e.to_string(),
                field: Some(e.field().to_string()),
            },
        ),
        SearchError::Query(_) | SearchError::Retrieval(_) | SearchError::Decode(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, internal_body())
        }
    }
}

fn internal_body() -> ApiErrorBody {
    ApiErrorBody {
        error: ERROR_INTERNAL,
        message: INTERNAL_MESSAGE.to_string(),
        field: None,
    }
}
