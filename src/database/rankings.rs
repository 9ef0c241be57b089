//! Ranking Repository - leaderboard, world record and activity queries
//!
//! Banned players are filtered out in SQL so the ranking layer never sees
//! their scores. Activity totals include everyone.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::store::with_timeout;
use crate::error::StoreError;
use crate::models::{GameMode, PlayerId, ScoreEntry, ScoreFilter, TimeWindow};

pub struct RankingRepository {
    pool: PgPool,
    timeout: Duration,
}

impl RankingRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Best score of every non-banned player, highest first
    pub async fn best_per_player(
        &self,
        filter: ScoreFilter,
        limit: usize,
    ) -> Result<Vec<ScoreEntry>, StoreError> {
        let mode = filter.game_mode.map(|m| m.as_str());
        let start = filter.window.map(|w| w.start);
        let end = filter.window.map(|w| w.end);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                r#"
                SELECT * FROM (
                    SELECT DISTINCT ON (s.player_id)
                        s.id, s.player_id, p.openplanet_id, p.display_name,
                        s.game_mode, s.score, s.maps_completed, s.maps_skipped,
                        s.duration_ms, s.created_at
                    FROM scores s
                    JOIN players p ON p.id = s.player_id
                    LEFT JOIN banned_players b ON b.player_id = s.player_id
                    WHERE b.player_id IS NULL
                      AND ($1::text IS NULL OR s.game_mode = $1)
                      AND ($2::timestamptz IS NULL OR s.created_at >= $2)
                      AND ($3::timestamptz IS NULL OR s.created_at < $3)
                    ORDER BY s.player_id, s.score DESC, s.created_at ASC, s.id ASC
                ) best
                ORDER BY best.score DESC, best.created_at ASC, best.id ASC
                LIMIT $4
                "#,
            )
            .bind(mode)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
        })
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Record holder per requested mode, optionally within a window
    pub async fn best_per_mode(
        &self,
        modes: &[GameMode],
        window: Option<TimeWindow>,
    ) -> Result<Vec<ScoreEntry>, StoreError> {
        let modes: Vec<&str> = modes.iter().map(GameMode::as_str).collect();
        let start = window.map(|w| w.start);
        let end = window.map(|w| w.end);

        let rows = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                r#"
                SELECT DISTINCT ON (s.game_mode)
                    s.id, s.player_id, p.openplanet_id, p.display_name,
                    s.game_mode, s.score, s.maps_completed, s.maps_skipped,
                    s.duration_ms, s.created_at
                FROM scores s
                JOIN players p ON p.id = s.player_id
                LEFT JOIN banned_players b ON b.player_id = s.player_id
                WHERE b.player_id IS NULL
                  AND s.game_mode = ANY($1)
                  AND ($2::timestamptz IS NULL OR s.created_at >= $2)
                  AND ($3::timestamptz IS NULL OR s.created_at < $3)
                ORDER BY s.game_mode, s.score DESC, s.created_at ASC, s.id ASC
                "#,
            )
            .bind(&modes)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
        })
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn daily_completed_maps(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, i64)>, StoreError> {
        let rows = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                r#"
                SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                       COALESCE(SUM(maps_completed), 0)::BIGINT AS total
                FROM scores
                WHERE created_at >= $1
                GROUP BY day
                ORDER BY day
                "#,
            )
            .bind(since)
            .fetch_all(&self.pool)
            .await?)
        })
        .await?;

        rows.iter()
            .map(|row| -> Result<(NaiveDate, i64), StoreError> {
                Ok((row.try_get("day")?, row.try_get("total")?))
            })
            .collect()
    }
}

fn entry_from_row(row: &PgRow) -> Result<ScoreEntry, StoreError> {
    let mode: String = row.try_get("game_mode")?;
    let game_mode = GameMode::parse(&mode)
        .ok_or_else(|| StoreError::Unavailable(format!("unknown game mode in scores: {mode}")))?;

    Ok(ScoreEntry {
        score_id: row.try_get("id")?,
        player_id: PlayerId(row.try_get("player_id")?),
        openplanet_id: row.try_get("openplanet_id")?,
        display_name: row.try_get("display_name")?,
        game_mode,
        score: row.try_get("score")?,
        maps_completed: row.try_get("maps_completed")?,
        maps_skipped: row.try_get("maps_skipped")?,
        duration_ms: row.try_get("duration_ms")?,
        created_at: row.try_get("created_at")?,
    })
}
