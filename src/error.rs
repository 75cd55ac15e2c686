//! Error types for the inspection pipeline engine.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by the core pipeline and its HTTP surface.
///
/// Variants correspond to the error kinds in the component design:
/// `InvalidInput`, `UpstreamTransient` (handled locally, rarely escapes),
/// `UpstreamFatal`, `ResponseMalformed` (handled locally, rarely escapes),
/// and `Cancelled`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("simulation path not found: {0}")]
    NotFound(String),

    #[error("upstream inference call failed transiently: {0}")]
    UpstreamTransient(String),

    #[error("upstream inference call failed: {0}")]
    UpstreamFatal(String),

    #[error("model response malformed: {0}")]
    ResponseMalformed(String),

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn other(msg: impl Into<String>) -> Self {
        PipelineError::Internal(anyhow::anyhow!(msg.into()))
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::UpstreamTransient(_)
            | PipelineError::UpstreamFatal(_)
            | PipelineError::ResponseMalformed(_)
            | PipelineError::Io(_)
            | PipelineError::Config(_)
            | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
