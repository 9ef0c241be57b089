//! Score Repository - submissions and cooldown lookups

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::debug;

use super::store::with_timeout;
use crate::error::StoreError;
use crate::models::{NewScore, PlayerId, ScoreReceipt};

pub struct ScoreRepository {
    pool: PgPool,
    timeout: Duration,
}

impl ScoreRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub async fn insert(&self, score: &NewScore) -> Result<ScoreReceipt, StoreError> {
        let row = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                r#"
                INSERT INTO scores
                (player_id, game_mode, score, maps_completed, maps_skipped, duration_ms, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, created_at
                "#,
            )
            .bind(score.player_id.0)
            .bind(score.game_mode.as_str())
            .bind(score.score)
            .bind(score.maps_completed)
            .bind(score.maps_skipped)
            .bind(score.duration_ms)
            .bind(&score.metadata)
            .fetch_one(&self.pool)
            .await?)
        })
        .await?;

        let receipt = ScoreReceipt {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
        };
        debug!(score_id = %receipt.id, player_id = %score.player_id, "Score inserted");
        Ok(receipt)
    }

    pub async fn count_since(
        &self,
        player_id: PlayerId,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let row = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                "SELECT COUNT(*) AS recent FROM scores WHERE player_id = $1 AND created_at > $2",
            )
            .bind(player_id.0)
            .bind(since)
            .fetch_one(&self.pool)
            .await?)
        })
        .await?;

        Ok(row.try_get("recent")?)
    }
}
