use crate::{auth, error::ApiError, AppState};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// JWT for the API and the WebSocket `token` parameter
    pub access_token: String,
    pub address: String,
}

/// Open a session for a connected wallet address
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let address = payload.address.trim();
    if !auth::is_valid_address(address) {
        return Err(ApiError::BadRequest(format!(
            "invalid wallet address: {:?}",
            address
        )));
    }

    let access_token = auth::generate_token(
        address,
        &state.config.security.jwt_secret,
        state.config.security.session_ttl_hours,
    )?;

    tracing::info!("Session opened for {}", address);

    Ok(Json(SessionResponse {
        access_token,
        address: address.to_lowercase(),
    }))
}
