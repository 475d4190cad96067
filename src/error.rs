//! Common error types for the gallery gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither credentials nor a fallback URL are configured
    #[error("No API credentials or fallback URL configured")]
    NoCredentialsConfigured,

    /// Every live credential failed or was invalidated during one call
    #[error("All API credentials failed after {attempts} attempt(s): {last_error}")]
    AllCredentialsExhausted { attempts: usize, last_error: String },

    /// The single fallback-mode call failed
    #[error("Upstream call failed: {0}")]
    UpstreamCallFailed(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record already liked: {0}")]
    AlreadyLiked(String),

    #[error("Duplicate record id: {0}")]
    DuplicateRecord(String),

    #[error("No image returned by the upstream model")]
    NoImageReturned,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response envelope
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_liked: Option<bool>,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl AppError {
    /// Status code, error type and machine-readable code for this error
    pub fn classify(&self) -> (StatusCode, &'static str, Option<&'static str>) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::NoCredentialsConfigured => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", Some("no_credentials_configured")),
            AppError::AllCredentialsExhausted { .. } => (StatusCode::SERVICE_UNAVAILABLE, "upstream_error", Some("all_credentials_exhausted")),
            AppError::UpstreamCallFailed(_) => (StatusCode::BAD_GATEWAY, "upstream_error", Some("upstream_call_failed")),
            AppError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", Some("record_not_found")),
            AppError::AlreadyLiked(_) => (StatusCode::CONFLICT, "conflict_error", Some("already_liked")),
            AppError::DuplicateRecord(_) => (StatusCode::CONFLICT, "conflict_error", Some("duplicate_record")),
            AppError::NoImageReturned => (StatusCode::BAD_GATEWAY, "upstream_error", Some("no_image_returned")),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", Some("rate_limit_exceeded")),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = self.classify();

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
            already_liked: matches!(self, AppError::AlreadyLiked(_)).then_some(true),
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
