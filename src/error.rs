//! Application error handling
//!
//! Aggregates module errors at the HTTP boundary and renders them as the
//! JSON error envelope `{"error": <message>}`. Processing faults map to
//! 500 without page-level granularity; only malformed request shape and
//! rejected segmentation parameters are client errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::ExtractError;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Extract(ExtractError::Segmentation(_)) => StatusCode::BAD_REQUEST,
            Self::Extract(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
