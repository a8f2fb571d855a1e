//! HTTP request handlers

pub mod devices;

pub use crate::state::AppState;
pub use devices::{devices_handler, AttestationData, AuthorizationRequest, AuthorizationResponse};

use crate::error::ApiError;

/// Fallback for unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Fallback for a known path with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
