//! Errors returned by the API handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clawpoly::error::{ChainDataError, ExplorerError, ProofError};
use serde_json::json;

/// A handler failure, rendered as a JSON error body.
///
/// Client errors carry their message to the caller. Upstream failures are
/// logged in full and answered with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed query parameter.
    #[error("{0}")]
    BadRequest(&'static str),

    /// The requested object does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// Unsupported HTTP method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Chain RPC failure.
    #[error(transparent)]
    Chain(#[from] ChainDataError),

    /// Block-explorer failure.
    #[error(transparent)]
    Explorer(#[from] ExplorerError),

    /// Response could not be hashed.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// Endpoint catalogue could not be read.
    #[error("failed to list endpoints: {0}")]
    Catalog(String),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Chain(_) | Self::Explorer(_) | Self::Proof(_) | Self::Catalog(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::BadRequest(_) | Self::NotFound(_) | Self::MethodNotAllowed => {
                json!({ "error": self.to_string() })
            }
            Self::Catalog(message) => {
                tracing::error!(error = %message, "endpoint listing failed");
                json!({ "error": "Internal server error", "message": message })
            }
            Self::Chain(_) | Self::Explorer(_) | Self::Proof(_) => {
                tracing::error!(error = %self, "search request failed");
                json!({ "error": "Internal server error" })
            }
        };
        (status, axum::Json(body)).into_response()
    }
}
