//! Database Connection Pool using sqlx

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use super::metrics::MetricRepository;
use super::players::PlayerRepository;
use super::rankings::RankingRepository;
use super::scores::ScoreRepository;
use super::sessions::SessionRepository;
use super::store::Datastore;
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::models::{
    GameMode, NewScore, PlayerId, ScoreEntry, ScoreFilter, ScoreReceipt, Session, TimeWindow,
};

const SCHEMA: &[(&str, &str)] = &[
    (
        "players",
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            openplanet_id TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "sessions",
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            player_id UUID NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            token_hash TEXT NOT NULL UNIQUE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "sessions_player_idx",
        "CREATE INDEX IF NOT EXISTS sessions_player_idx ON sessions (player_id)",
    ),
    (
        "scores",
        r#"
        CREATE TABLE IF NOT EXISTS scores (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            player_id UUID NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            game_mode TEXT NOT NULL CHECK (game_mode IN ('author', 'gold', 'custom')),
            score INTEGER NOT NULL CHECK (score >= 0),
            maps_completed INTEGER NOT NULL CHECK (maps_completed >= 0),
            maps_skipped INTEGER NOT NULL CHECK (maps_skipped >= 0),
            duration_ms INTEGER NOT NULL CHECK (duration_ms >= 0),
            metadata JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "scores_player_created_idx",
        "CREATE INDEX IF NOT EXISTS scores_player_created_idx ON scores (player_id, created_at DESC)",
    ),
    (
        "scores_mode_score_idx",
        "CREATE INDEX IF NOT EXISTS scores_mode_score_idx ON scores (game_mode, score DESC)",
    ),
    (
        "scores_created_idx",
        "CREATE INDEX IF NOT EXISTS scores_created_idx ON scores (created_at)",
    ),
    (
        "banned_players",
        r#"
        CREATE TABLE IF NOT EXISTS banned_players (
            player_id UUID PRIMARY KEY REFERENCES players(id) ON DELETE CASCADE,
            reason TEXT,
            banned_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "metrics",
        r#"
        CREATE TABLE IF NOT EXISTS metrics (
            name TEXT NOT NULL,
            date DATE NOT NULL,
            count BIGINT NOT NULL DEFAULT 0,
            PRIMARY KEY (name, date)
        )
        "#,
    ),
];

pub struct DatabasePool {
    pool: PgPool,
    players: PlayerRepository,
    sessions: SessionRepository,
    scores: ScoreRepository,
    rankings: RankingRepository,
    metrics: MetricRepository,
}

impl DatabasePool {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "Connected to PostgreSQL");

        let timeout = config.query_timeout;
        Ok(Self {
            players: PlayerRepository::new(pool.clone(), timeout),
            sessions: SessionRepository::new(pool.clone(), timeout),
            scores: ScoreRepository::new(pool.clone(), timeout),
            rankings: RankingRepository::new(pool.clone(), timeout),
            metrics: MetricRepository::new(pool.clone(), timeout),
            pool,
        })
    }

    /// Create tables and indexes that do not exist yet
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        info!("Initializing database schema...");

        for (name, statement) in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
            debug!(object = name, "Schema object ready");
        }

        info!("Database schema initialized");
        Ok(())
    }

}

#[async_trait]
impl Datastore for DatabasePool {
    async fn upsert_player(
        &self,
        openplanet_id: &str,
        display_name: &str,
    ) -> Result<PlayerId, StoreError> {
        self.players.upsert(openplanet_id, display_name).await
    }

    async fn create_session(
        &self,
        player_id: PlayerId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.sessions.create(player_id, token_hash, expires_at).await
    }

    async fn find_session_by_token_hash(&self, token_hash: &str) -> Result<Session, StoreError> {
        self.sessions.find_by_token_hash(token_hash).await
    }

    async fn is_player_banned(&self, player_id: PlayerId) -> Result<bool, StoreError> {
        self.players.is_banned(player_id).await
    }

    async fn count_scores_since(
        &self,
        player_id: PlayerId,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.scores.count_since(player_id, since).await
    }

    async fn insert_score(&self, score: &NewScore) -> Result<ScoreReceipt, StoreError> {
        self.scores.insert(score).await
    }

    async fn best_scores_per_player(
        &self,
        filter: ScoreFilter,
        limit: usize,
    ) -> Result<Vec<ScoreEntry>, StoreError> {
        self.rankings.best_per_player(filter, limit).await
    }

    async fn best_score_per_mode(
        &self,
        modes: &[GameMode],
        window: Option<TimeWindow>,
    ) -> Result<Vec<ScoreEntry>, StoreError> {
        self.rankings.best_per_mode(modes, window).await
    }

    async fn daily_completed_maps(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, i64)>, StoreError> {
        self.rankings.daily_completed_maps(since).await
    }

    async fn increment_metric(&self, name: &str, increment: i64) -> Result<(), StoreError> {
        self.metrics.increment(name, increment).await
    }
}
