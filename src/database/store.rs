//! Datastore abstraction used by every service
//!
//! `DatabasePool` implements it over PostgreSQL, `InMemoryDatastore` over
//! process memory for tests and dev mode.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;
use crate::models::{
    GameMode, NewScore, PlayerId, ScoreEntry, ScoreFilter, ScoreReceipt, Session, TimeWindow,
};

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Insert or refresh a player, returning the internal id
    async fn upsert_player(
        &self,
        openplanet_id: &str,
        display_name: &str,
    ) -> Result<PlayerId, StoreError>;

    /// Store a new session, replacing any previous session of the player
    async fn create_session(
        &self,
        player_id: PlayerId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// `StoreError::NotFound` when no session has this digest
    async fn find_session_by_token_hash(&self, token_hash: &str) -> Result<Session, StoreError>;

    async fn is_player_banned(&self, player_id: PlayerId) -> Result<bool, StoreError>;

    /// Scores of the player created strictly after `since`
    async fn count_scores_since(
        &self,
        player_id: PlayerId,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    async fn insert_score(&self, score: &NewScore) -> Result<ScoreReceipt, StoreError>;

    /// Best entry per non-banned player, in leaderboard order, at most `limit`
    async fn best_scores_per_player(
        &self,
        filter: ScoreFilter,
        limit: usize,
    ) -> Result<Vec<ScoreEntry>, StoreError>;

    /// Best entry per mode among non-banned players
    async fn best_score_per_mode(
        &self,
        modes: &[GameMode],
        window: Option<TimeWindow>,
    ) -> Result<Vec<ScoreEntry>, StoreError>;

    /// Total maps completed per UTC day for scores created at or after `since`.
    /// Days without scores are absent.
    async fn daily_completed_maps(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, i64)>, StoreError>;

    /// Add `increment` to today's counter for `name`
    async fn increment_metric(&self, name: &str, increment: i64) -> Result<(), StoreError>;
}

/// Bound a datastore call; an elapsed deadline becomes `StoreError::Timeout`
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
