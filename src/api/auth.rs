//! `POST /auth` - exchange an Openplanet token for a session token

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;
use super::extractors::{ClientIp, RawBody};
use super::middleware::sanitize_for_log;
use crate::error::ApiError;
use crate::session::IssuedSession;

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub openplanet_token: String,
}

pub async fn sign_in(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    RawBody(body): RawBody,
) -> Result<Json<IssuedSession>, ApiError> {
    if !state.auth_limiter.allow(&ip) {
        warn!(client_ip = %sanitize_for_log(&ip), "Auth rate limit exceeded");
        return Err(ApiError::RateLimited("rate limit exceeded".to_string()));
    }

    let request: AuthRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::Validation("invalid request body".to_string()))?;

    let token = request.openplanet_token.trim();
    if token.is_empty() {
        return Err(ApiError::Validation(
            "openplanet_token is required".to_string(),
        ));
    }

    let identity = state.identity.verify(token).await?;
    let session = state
        .sessions
        .sign_in(&identity)
        .await
        .map_err(ApiError::unavailable)?;

    info!(account_id = %identity.account_id, "Player signed in");
    Ok(Json(session))
}
