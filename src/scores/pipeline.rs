//! Score submission pipeline
//!
//! Order matters: ban check, payload validation, cooldown, persist. Banned
//! players get a plausible receipt and their payload is never inspected.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::validation::{ScoreSubmission, ValidationError};
use crate::database::Datastore;
use crate::error::{ApiError, StoreError};
use crate::models::{NewScore, PlayerId, ScoreReceipt};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("please wait before submitting another score")]
    CoolingDown,

    #[error("score store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Invalid(e) => ApiError::Validation(e.to_string()),
            SubmissionError::CoolingDown => {
                ApiError::RateLimited(SubmissionError::CoolingDown.to_string())
            }
            SubmissionError::Store(e) => ApiError::unavailable(e),
        }
    }
}

pub struct ScorePipeline {
    store: Arc<dyn Datastore>,
    cooldown: chrono::Duration,
    /// Serializes cooldown check and insert per player within this process
    submission_locks: DashMap<PlayerId, Arc<Mutex<()>>>,
}

impl ScorePipeline {
    pub fn new(store: Arc<dyn Datastore>, cooldown: Duration) -> Self {
        Self {
            store,
            cooldown: chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::MAX),
            submission_locks: DashMap::new(),
        }
    }

    /// Run a raw JSON body from an authenticated player through the pipeline
    pub async fn submit(
        &self,
        player_id: PlayerId,
        body: &[u8],
    ) -> Result<ScoreReceipt, SubmissionError> {
        if self.store.is_player_banned(player_id).await? {
            info!(player_id = %player_id, "Shadow-accepted score from banned player");
            return Ok(ScoreReceipt::shadow());
        }

        let score = ScoreSubmission::from_json(body)?.into_new_score(player_id)?;

        let lock = self
            .submission_locks
            .entry(player_id)
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.persist_outside_cooldown(&score).await
        };

        drop(lock);
        self.submission_locks
            .remove_if(&player_id, |_, l| Arc::strong_count(l) == 1);

        let receipt = result?;
        debug!(
            player_id = %player_id,
            score_id = %receipt.id,
            game_mode = %score.game_mode,
            score = score.score,
            "Score stored"
        );
        Ok(receipt)
    }

    async fn persist_outside_cooldown(
        &self,
        score: &NewScore,
    ) -> Result<ScoreReceipt, SubmissionError> {
        let since = Utc::now()
            .checked_sub_signed(self.cooldown)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        if self.store.count_scores_since(score.player_id, since).await? > 0 {
            return Err(SubmissionError::CoolingDown);
        }

        Ok(self.store.insert_score(score).await?)
    }

    /// Players with a submission currently in flight
    pub fn in_flight(&self) -> usize {
        self.submission_locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryDatastore;
    use crate::models::GameMode;
    use serde_json::json;

    fn body(score: i64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "game_mode": "gold",
            "score": score,
            "maps_completed": score,
            "maps_skipped": 0,
            "duration_ms": 3_600_000,
        }))
        .unwrap()
    }

    async fn setup(cooldown: Duration) -> (Arc<InMemoryDatastore>, ScorePipeline, PlayerId) {
        let store = Arc::new(InMemoryDatastore::new());
        let player = store.upsert_player("op-1", "Player").await.unwrap();
        let pipeline = ScorePipeline::new(store.clone(), cooldown);
        (store, pipeline, player)
    }

    #[tokio::test]
    async fn test_accepts_valid_score() {
        let (store, pipeline, player) = setup(Duration::from_secs(600)).await;

        let receipt = pipeline.submit(player, &body(7)).await.unwrap();
        assert_eq!(store.score_count().await, 1);
        assert!(receipt.created_at <= Utc::now());
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cooldown_rejects_second_submission() {
        let (store, pipeline, player) = setup(Duration::from_secs(600)).await;

        pipeline.submit(player, &body(7)).await.unwrap();
        let err = pipeline.submit(player, &body(8)).await.unwrap_err();

        assert!(matches!(err, SubmissionError::CoolingDown));
        assert_eq!(store.score_count().await, 1);
    }

    #[tokio::test]
    async fn test_cooldown_elapsed_allows_submission() {
        let (store, pipeline, player) = setup(Duration::from_secs(600)).await;
        let old = NewScore {
            player_id: player,
            game_mode: GameMode::Author,
            score: 3,
            maps_completed: 3,
            maps_skipped: 0,
            duration_ms: 3_600_000,
            metadata: None,
        };
        store
            .insert_score_at(&old, Utc::now() - chrono::Duration::minutes(11))
            .await;

        pipeline.submit(player, &body(9)).await.unwrap();
        assert_eq!(store.score_count().await, 2);
    }

    #[tokio::test]
    async fn test_banned_player_gets_shadow_receipt() {
        let (store, pipeline, player) = setup(Duration::from_secs(600)).await;
        store.ban_player(player).await;

        // Even an invalid payload "succeeds"
        let receipt = pipeline.submit(player, b"garbage").await.unwrap();
        assert!(!receipt.id.is_nil());
        assert_eq!(store.score_count().await, 0);

        // And there is no cooldown to leak the ban either
        pipeline.submit(player, &body(5)).await.unwrap();
        assert_eq!(store.score_count().await, 0);
    }

    #[tokio::test]
    async fn test_validation_runs_before_cooldown() {
        let (_store, pipeline, player) = setup(Duration::from_secs(600)).await;

        pipeline.submit(player, &body(7)).await.unwrap();
        let err = pipeline.submit(player, &body(-1)).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_store_one() {
        let (store, pipeline, player) = setup(Duration::from_secs(600)).await;
        let pipeline = Arc::new(pipeline);

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.submit(player, &body(i)).await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(store.score_count().await, 1);
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[test]
    fn test_error_mapping() {
        let err: ApiError = SubmissionError::CoolingDown.into();
        assert_eq!(err.status_code(), axum::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "please wait before submitting another score");

        let err: ApiError =
            SubmissionError::Invalid(ValidationError::MetadataNotObject).into();
        assert_eq!(err.to_string(), "metadata must be a JSON object");
    }
}
