//! Device authorization handler
//!
//! Handles POST /devices: looks up the attested permanent identifier in the
//! allow-list and answers with the allow flag and the stored data payload.

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::db::StoreError;
use crate::error::ApiError;
use crate::policy::{decide, DecisionSource};
use crate::state::AppState;

/// Attestation payload sent by the caller. Only the identifier is used.
#[derive(Debug, Deserialize)]
pub struct AttestationData {
    #[serde(default)]
    pub permanent_identifier: Option<String>,
}

/// Request body for an authorization query.
#[derive(Debug, Deserialize)]
pub struct AuthorizationRequest {
    #[serde(default)]
    pub attestation_data: Option<AttestationData>,
}

impl AuthorizationRequest {
    /// The permanent identifier, if present and non-empty.
    pub fn permanent_identifier(&self) -> Option<&str> {
        self.attestation_data
            .as_ref()
            .and_then(|a| a.permanent_identifier.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Authorization answer.
#[derive(Debug, Serialize)]
pub struct AuthorizationResponse {
    pub allow: bool,
    /// Stored payload, forwarded verbatim; `null` when there is none
    pub data: Option<Box<RawValue>>,
}

/// POST /devices - Authorize an attested device
///
/// Unknown identifiers are denied with a 200 response. Lookup failures other
/// than "not found" produce a bare 500.
pub async fn devices_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AuthorizationResponse>, ApiError> {
    let request: AuthorizationRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;

    let device_id = request
        .permanent_identifier()
        .ok_or_else(|| ApiError::bad_request("Missing attestation_data.permanent_identifier"))?;

    let lookup = tokio::time::timeout(state.lookup_timeout, state.store.find_device(device_id))
        .await
        .unwrap_or(Err(StoreError::Timeout(state.lookup_timeout)));

    let decision = decide(lookup).map_err(|e| {
        tracing::error!(device_id = %device_id, error = %e, "Device lookup failed");
        ApiError::from(e)
    })?;

    let data = encode_data(decision.data())?;

    tracing::info!(
        device_id = %device_id,
        allow = decision.allow(),
        default_deny = decision.source == DecisionSource::DefaultDeny,
        "Device authorization decided"
    );

    Ok(Json(AuthorizationResponse {
        allow: decision.allow(),
        data,
    }))
}

/// Forward the stored bytes as raw JSON. Empty means `null`.
fn encode_data(data: &[u8]) -> Result<Option<Box<RawValue>>, ApiError> {
    if data.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice::<Box<RawValue>>(data)
        .map(Some)
        .map_err(|e| ApiError::internal(format!("Stored device data is not valid JSON: {}", e)))
}
