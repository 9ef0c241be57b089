//! `POST /scores` - submit a finished run

use axum::{Json, extract::State, http::StatusCode};

use super::AppState;
use super::extractors::{AuthenticatedPlayer, RawBody};
use crate::error::ApiError;
use crate::models::ScoreReceipt;

/// Banned players get the same 201 as everyone else
pub async fn submit_score(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
    RawBody(body): RawBody,
) -> Result<(StatusCode, Json<ScoreReceipt>), ApiError> {
    let receipt = state.scores.submit(player_id, &body).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
