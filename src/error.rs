//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` and serialize as a JSON `{"detail": ...}`
//! body, which is the shape the front end expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::compressor::CompressError;
use crate::pdf::merge::MergeError;

/// Application-level error types
///
/// Every failure a request can hit maps onto one of these variants. Caller
/// mistakes (bad file count, bad quality range, malformed PDFs on merge) are
/// `Validation` and reported as 400; everything else is a server-side failure.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input shape, count, type, or parameter range. Never retried.
    #[error("{0}")]
    Validation(String),

    /// The compression backend crashed, timed out, or produced no output
    #[error("Compression failed: {0}")]
    Backend(#[from] CompressError),

    /// Scratch storage read/write failed
    #[error("Scratch storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MergeError> for AppError {
    fn from(err: MergeError) -> Self {
        match err {
            // A file the caller uploaded did not parse as a PDF
            MergeError::InvalidPdf(..) | MergeError::NoPages => {
                AppError::Validation(err.to_string())
            }
            MergeError::Save(_) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(CompressError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "detail": self.to_string(),
        }));

        (status, body).into_response()
    }
}
