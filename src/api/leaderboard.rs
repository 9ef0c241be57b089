//! `GET /leaderboard` and `GET /worldrecords`

use axum::{
    Json,
    extract::State,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppState;
use super::extractors::QueryParams;
use super::middleware::cached;
use crate::error::ApiError;
use crate::models::{GameMode, ScoreEntry};
use crate::ranking::{Leaderboard, Period, RankedEntry};

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub game_mode: Option<String>,
    pub period: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub scores: Vec<LeaderboardRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    /// `"all"` when unfiltered
    pub game_mode: String,
}

#[derive(Debug, Serialize)]
pub struct PlayerView {
    pub openplanet_id: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub player: PlayerView,
    pub score: i32,
    pub maps_completed: i32,
    pub maps_skipped: i32,
    pub duration_ms: i32,
    pub game_mode: GameMode,
    pub created_at: DateTime<Utc>,
}

impl From<RankedEntry> for LeaderboardRow {
    fn from(ranked: RankedEntry) -> Self {
        let entry = ranked.entry;
        Self {
            rank: ranked.rank,
            player: PlayerView {
                openplanet_id: entry.openplanet_id,
                display_name: entry.display_name,
            },
            score: entry.score,
            maps_completed: entry.maps_completed,
            maps_skipped: entry.maps_skipped,
            duration_ms: entry.duration_ms,
            game_mode: entry.game_mode,
            created_at: entry.created_at,
        }
    }
}

impl From<Leaderboard> for LeaderboardResponse {
    fn from(board: Leaderboard) -> Self {
        Self {
            month: board.period.month().map(|m| m.to_string()),
            game_mode: board
                .game_mode
                .map_or_else(|| "all".to_string(), |m| m.to_string()),
            scores: board.entries.into_iter().map(LeaderboardRow::from).collect(),
        }
    }
}

/// Only ranked modes have leaderboards; empty means every mode
fn parse_mode_filter(raw: Option<&str>) -> Result<Option<GameMode>, ApiError> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(None),
        Some(value) => GameMode::parse(value)
            .filter(GameMode::is_ranked)
            .map(Some)
            .ok_or_else(|| ApiError::Validation("game_mode must be 'author', or 'gold'".to_string())),
    }
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<LeaderboardQuery>,
) -> Result<Response, ApiError> {
    let game_mode = parse_mode_filter(query.game_mode.as_deref())?;
    let period = Period::from_query(query.period.as_deref(), query.month.as_deref(), Utc::now())
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let board = state.ranker.leaderboard(game_mode, period).await?;
    Ok(cached(
        state.cache.leaderboard_ttl,
        Json(LeaderboardResponse::from(board)),
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub score: i32,
    pub player_name: String,
    pub date: DateTime<Utc>,
}

impl From<&ScoreEntry> for RecordView {
    fn from(entry: &ScoreEntry) -> Self {
        Self {
            score: entry.score,
            player_name: entry.display_name.clone(),
            date: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorldRecordsResponse {
    pub all_time: BTreeMap<GameMode, RecordView>,
    pub monthly: BTreeMap<GameMode, RecordView>,
    // Flat keys kept for older plugin builds; they mirror all_time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<RecordView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold: Option<RecordView>,
}

pub async fn get_world_records(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = state.ranker.world_records().await?;

    let views = |map: &BTreeMap<GameMode, ScoreEntry>| -> BTreeMap<GameMode, RecordView> {
        map.iter().map(|(mode, e)| (*mode, RecordView::from(e))).collect()
    };
    let all_time = views(&records.all_time);
    let response = WorldRecordsResponse {
        author: all_time.get(&GameMode::Author).cloned(),
        gold: all_time.get(&GameMode::Gold).cloned(),
        monthly: views(&records.monthly),
        all_time,
    };

    Ok(cached(state.cache.world_records_ttl, Json(response)))
}
