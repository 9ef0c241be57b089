//! Best-score-per-player leaderboards with dense ranking

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{PlayerId, ScoreEntry};

/// Entries returned by a leaderboard query
pub const LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub rank: u32,
    pub entry: ScoreEntry,
}

/// Leaderboard order: score descending, then earliest submission, then id
pub fn ranking_order(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.score_id.cmp(&b.score_id))
}

/// Keep each player's best entry, sorted in leaderboard order
pub fn best_per_player<I>(entries: I) -> Vec<ScoreEntry>
where
    I: IntoIterator<Item = ScoreEntry>,
{
    let mut best: HashMap<PlayerId, ScoreEntry> = HashMap::new();
    for entry in entries {
        let better = best
            .get(&entry.player_id)
            .is_none_or(|current| ranking_order(&entry, current) == Ordering::Less);
        if better {
            best.insert(entry.player_id, entry);
        }
    }

    let mut ranked: Vec<ScoreEntry> = best.into_values().collect();
    ranked.sort_by(ranking_order);
    ranked
}

/// Assign dense ranks to entries already sorted by score descending.
/// Equal scores share a rank and the next distinct score continues without gaps.
pub fn assign_dense_ranks(entries: Vec<ScoreEntry>) -> Vec<RankedEntry> {
    let mut rank = 0u32;
    let mut previous: Option<i32> = None;

    entries
        .into_iter()
        .map(|entry| {
            if previous != Some(entry.score) {
                rank += 1;
                previous = Some(entry.score);
            }
            RankedEntry { rank, entry }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::GameMode;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    pub(crate) fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap()
    }

    pub(crate) fn entry(player: PlayerId, name: &str, score: i32, minutes: i64) -> ScoreEntry {
        ScoreEntry {
            score_id: Uuid::new_v4(),
            player_id: player,
            openplanet_id: format!("op-{name}"),
            display_name: name.to_string(),
            game_mode: GameMode::Author,
            score,
            maps_completed: score,
            maps_skipped: 0,
            duration_ms: 3_600_000,
            created_at: base_time() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_best_per_player_keeps_highest() {
        let alice = PlayerId::new();
        let bob = PlayerId::new();

        let best = best_per_player(vec![
            entry(alice, "alice", 10, 0),
            entry(alice, "alice", 30, 1),
            entry(bob, "bob", 20, 2),
            entry(alice, "alice", 15, 3),
        ]);

        assert_eq!(best.len(), 2);
        assert_eq!(best[0].display_name, "alice");
        assert_eq!(best[0].score, 30);
        assert_eq!(best[1].display_name, "bob");
    }

    #[test]
    fn test_best_per_player_prefers_earliest_on_tie() {
        let alice = PlayerId::new();
        let later = entry(alice, "alice", 25, 10);
        let earlier = entry(alice, "alice", 25, 5);
        let earlier_id = earlier.score_id;

        let best = best_per_player(vec![later, earlier]);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].score_id, earlier_id);
    }

    #[test]
    fn test_dense_ranks_share_and_do_not_skip() {
        let entries = best_per_player(vec![
            entry(PlayerId::new(), "a", 50, 0),
            entry(PlayerId::new(), "b", 50, 1),
            entry(PlayerId::new(), "c", 40, 2),
            entry(PlayerId::new(), "d", 30, 3),
            entry(PlayerId::new(), "e", 30, 4),
        ]);

        let ranks: Vec<u32> = assign_dense_ranks(entries).iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 1, 2, 3, 3]);
    }

    #[test]
    fn test_ties_ordered_by_submission_time() {
        let entries = best_per_player(vec![
            entry(PlayerId::new(), "late", 50, 9),
            entry(PlayerId::new(), "early", 50, 1),
        ]);

        assert_eq!(entries[0].display_name, "early");
        assert_eq!(entries[1].display_name, "late");
    }

    #[test]
    fn test_empty_input() {
        assert!(assign_dense_ranks(best_per_player(Vec::new())).is_empty());
    }
}
