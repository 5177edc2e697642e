//! Handler-level errors
//!
//! AI failures never show up here: the gateway always answers with text.
//! These cover client input and catalog lookups only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Client request errors, rendered as `{"status":"error","message":...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Upload form without a `file` part. Answered with 200; the body
    /// carries the error.
    #[error("No file part")]
    MissingFile,

    #[error("invalid upload: {0}")]
    Upload(String),

    #[error("{0}")]
    Validation(String),

    #[error("Product not found")]
    ProductNotFound(u64),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFile => StatusCode::OK,
            ApiError::Upload(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        });
        (
            self.status_code(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
