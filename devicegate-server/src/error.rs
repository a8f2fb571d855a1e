//! API error handling module
//!
//! Every failure is scoped to one request. Responses carry only the canonical
//! status text; internal details are logged and never sent to the caller.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::Level;

use crate::db::StoreError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - malformed body or missing identifier
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unknown route
    #[error("Not found")]
    NotFound,

    /// Known route, wrong method
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Allow-list lookup failed (anything other than "not found")
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Store(StoreError::Timeout(_)) => "store_timeout",
            Self::Store(_) => "store",
            Self::Internal(_) => "internal",
        }
    }

    /// Level the response is logged at. Store failures are already logged
    /// with the device id where they happen.
    fn log_level(&self) -> Level {
        match self {
            Self::BadRequest(_) => Level::WARN,
            Self::NotFound | Self::MethodNotAllowed | Self::Store(_) => Level::DEBUG,
            Self::Internal(_) => Level::ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();

        let level = self.log_level();
        if level == Level::ERROR {
            tracing::error!(status = %status, category, error = %self, "Server error");
        } else if level == Level::WARN {
            tracing::warn!(status = %status, category, error = %self, "Client error");
        } else {
            tracing::debug!(status = %status, category, error = %self, "Request failed");
        }

        let text = status.canonical_reason().unwrap_or("Error");
        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            format!("{text}\n"),
        )
            .into_response()
    }
}
