//! In-memory datastore for tests and dev mode
//!
//! Mirrors the PostgreSQL semantics: one session per player, unique token
//! digests, banned players excluded from rankings, per-day metric counters.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::store::Datastore;
use crate::error::StoreError;
use crate::models::{
    GameMode, NewScore, Player, PlayerId, ScoreEntry, ScoreFilter, ScoreReceipt, Session,
    TimeWindow,
};
use crate::ranking::leaderboard::best_per_player;
use crate::ranking::world_records::best_per_mode;

#[derive(Debug, Clone)]
struct StoredScore {
    id: Uuid,
    score: NewScore,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    players: HashMap<PlayerId, Player>,
    by_openplanet_id: HashMap<String, PlayerId>,
    /// Keyed by token digest
    sessions: HashMap<String, Session>,
    banned: HashSet<PlayerId>,
    scores: Vec<StoredScore>,
    metrics: HashMap<(String, NaiveDate), i64>,
}

impl MemoryState {
    fn entries(&self) -> impl Iterator<Item = ScoreEntry> + '_ {
        self.scores
            .iter()
            .filter(|s| !self.banned.contains(&s.score.player_id))
            .filter_map(|s| {
                let player = self.players.get(&s.score.player_id)?;
                Some(ScoreEntry {
                    score_id: s.id,
                    player_id: player.id,
                    openplanet_id: player.openplanet_id.clone(),
                    display_name: player.display_name.clone(),
                    game_mode: s.score.game_mode,
                    score: s.score.score,
                    maps_completed: s.score.maps_completed,
                    maps_skipped: s.score.maps_skipped,
                    duration_ms: s.score.duration_ms,
                    created_at: s.created_at,
                })
            })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDatastore {
    state: RwLock<MemoryState>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ban_player(&self, player_id: PlayerId) {
        self.state.write().await.banned.insert(player_id);
    }

    pub async fn player_by_openplanet_id(&self, openplanet_id: &str) -> Option<Player> {
        let state = self.state.read().await;
        let id = state.by_openplanet_id.get(openplanet_id)?;
        state.players.get(id).cloned()
    }

    /// Number of stored scores, banned players included
    pub async fn score_count(&self) -> usize {
        self.state.read().await.scores.len()
    }

    pub async fn metric_count(&self, name: &str, day: NaiveDate) -> i64 {
        self.state
            .read()
            .await
            .metrics
            .get(&(name.to_string(), day))
            .copied()
            .unwrap_or(0)
    }

    /// Insert with an explicit creation time, for seeding history
    pub async fn insert_score_at(&self, score: &NewScore, created_at: DateTime<Utc>) -> ScoreReceipt {
        let id = Uuid::new_v4();
        self.state.write().await.scores.push(StoredScore {
            id,
            score: score.clone(),
            created_at,
        });
        ScoreReceipt { id, created_at }
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn upsert_player(
        &self,
        openplanet_id: &str,
        display_name: &str,
    ) -> Result<PlayerId, StoreError> {
        let mut state = self.state.write().await;

        if let Some(id) = state.by_openplanet_id.get(openplanet_id).copied() {
            if let Some(player) = state.players.get_mut(&id) {
                player.display_name = display_name.to_string();
            }
            return Ok(id);
        }

        let id = PlayerId::new();
        state.players.insert(
            id,
            Player {
                id,
                openplanet_id: openplanet_id.to_string(),
                display_name: display_name.to_string(),
            },
        );
        state.by_openplanet_id.insert(openplanet_id.to_string(), id);
        debug!(player_id = %id, "Player created");
        Ok(id)
    }

    async fn create_session(
        &self,
        player_id: PlayerId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.sessions.contains_key(token_hash) {
            return Err(StoreError::Unavailable(
                "duplicate session token digest".to_string(),
            ));
        }

        state.sessions.retain(|_, s| s.player_id != player_id);
        state.sessions.insert(
            token_hash.to_string(),
            Session {
                id: Uuid::new_v4(),
                player_id,
                token_hash: token_hash.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_session_by_token_hash(&self, token_hash: &str) -> Result<Session, StoreError> {
        self.state
            .read()
            .await
            .sessions
            .get(token_hash)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn is_player_banned(&self, player_id: PlayerId) -> Result<bool, StoreError> {
        Ok(self.state.read().await.banned.contains(&player_id))
    }

    async fn count_scores_since(
        &self,
        player_id: PlayerId,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        let count = state
            .scores
            .iter()
            .filter(|s| s.score.player_id == player_id && s.created_at > since)
            .count();
        Ok(count as i64)
    }

    async fn insert_score(&self, score: &NewScore) -> Result<ScoreReceipt, StoreError> {
        Ok(self.insert_score_at(score, Utc::now()).await)
    }

    async fn best_scores_per_player(
        &self,
        filter: ScoreFilter,
        limit: usize,
    ) -> Result<Vec<ScoreEntry>, StoreError> {
        let state = self.state.read().await;
        let mut best = best_per_player(state.entries().filter(|e| filter.matches(e)));
        best.truncate(limit);
        Ok(best)
    }

    async fn best_score_per_mode(
        &self,
        modes: &[GameMode],
        window: Option<TimeWindow>,
    ) -> Result<Vec<ScoreEntry>, StoreError> {
        let state = self.state.read().await;
        let in_window = state
            .entries()
            .filter(|e| window.is_none_or(|w| w.contains(e.created_at)));
        Ok(best_per_mode(in_window, modes).into_values().collect())
    }

    async fn daily_completed_maps(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, i64)>, StoreError> {
        let state = self.state.read().await;
        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for stored in state.scores.iter().filter(|s| s.created_at >= since) {
            *per_day.entry(stored.created_at.date_naive()).or_default() +=
                i64::from(stored.score.maps_completed);
        }
        Ok(per_day.into_iter().collect())
    }

    async fn increment_metric(&self, name: &str, increment: i64) -> Result<(), StoreError> {
        let today = Utc::now().date_naive();
        *self
            .state
            .write()
            .await
            .metrics
            .entry((name.to_string(), today))
            .or_default() += increment;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_score(player_id: PlayerId, mode: GameMode, score: i32) -> NewScore {
        NewScore {
            player_id,
            game_mode: mode,
            score,
            maps_completed: score,
            maps_skipped: 1,
            duration_ms: 3_600_000,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_player_updates_display_name() {
        let store = InMemoryDatastore::new();
        let first = store.upsert_player("op-1", "Old").await.unwrap();
        let second = store.upsert_player("op-1", "New").await.unwrap();

        assert_eq!(first, second);
        let player = store.player_by_openplanet_id("op-1").await.unwrap();
        assert_eq!(player.display_name, "New");
    }

    #[tokio::test]
    async fn test_new_session_replaces_previous() {
        let store = InMemoryDatastore::new();
        let player = store.upsert_player("op-1", "P").await.unwrap();
        let expires = Utc::now() + Duration::hours(1);

        store.create_session(player, "hash-a", expires).await.unwrap();
        store.create_session(player, "hash-b", expires).await.unwrap();

        assert!(matches!(
            store.find_session_by_token_hash("hash-a").await,
            Err(StoreError::NotFound)
        ));
        assert_eq!(
            store.find_session_by_token_hash("hash-b").await.unwrap().player_id,
            player
        );
    }

    #[tokio::test]
    async fn test_banned_players_excluded_from_rankings() {
        let store = InMemoryDatastore::new();
        let good = store.upsert_player("op-good", "Good").await.unwrap();
        let cheat = store.upsert_player("op-cheat", "Cheat").await.unwrap();

        store.insert_score(&new_score(good, GameMode::Author, 10)).await.unwrap();
        store.insert_score(&new_score(cheat, GameMode::Author, 999)).await.unwrap();
        store.ban_player(cheat).await;

        let board = store
            .best_scores_per_player(ScoreFilter::default(), 100)
            .await
            .unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].player_id, good);

        let records = store
            .best_score_per_mode(&GameMode::RANKED, None)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 10);
    }

    #[tokio::test]
    async fn test_count_scores_since_is_strict() {
        let store = InMemoryDatastore::new();
        let player = store.upsert_player("op-1", "P").await.unwrap();
        let at = Utc::now() - Duration::minutes(5);
        store
            .insert_score_at(&new_score(player, GameMode::Gold, 1), at)
            .await;

        assert_eq!(store.count_scores_since(player, at).await.unwrap(), 0);
        assert_eq!(
            store
                .count_scores_since(player, at - Duration::seconds(1))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_daily_completed_maps_groups_by_day() {
        let store = InMemoryDatastore::new();
        let player = store.upsert_player("op-1", "P").await.unwrap();
        let now = Utc::now();

        store.insert_score_at(&new_score(player, GameMode::Author, 3), now).await;
        store.insert_score_at(&new_score(player, GameMode::Gold, 4), now).await;
        store
            .insert_score_at(&new_score(player, GameMode::Gold, 9), now - Duration::days(40))
            .await;

        let days = store
            .daily_completed_maps(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(days, vec![(now.date_naive(), 7)]);
    }

    #[tokio::test]
    async fn test_metric_counter_accumulates() {
        let store = InMemoryDatastore::new();
        store.increment_metric("run_started", 1).await.unwrap();
        store.increment_metric("run_started", 4).await.unwrap();

        assert_eq!(
            store.metric_count("run_started", Utc::now().date_naive()).await,
            5
        );
    }
}
