//! World records: the single best score of each ranked mode

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::leaderboard::ranking_order;
use crate::models::{GameMode, ScoreEntry};

/// Best entry per mode, restricted to `modes`
pub fn best_per_mode<I>(entries: I, modes: &[GameMode]) -> BTreeMap<GameMode, ScoreEntry>
where
    I: IntoIterator<Item = ScoreEntry>,
{
    let mut best: BTreeMap<GameMode, ScoreEntry> = BTreeMap::new();
    for entry in entries.into_iter().filter(|e| modes.contains(&e.game_mode)) {
        let better = best
            .get(&entry.game_mode)
            .is_none_or(|current| ranking_order(&entry, current) == Ordering::Less);
        if better {
            best.insert(entry.game_mode, entry);
        }
    }
    best
}

/// All-time and current-month records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldRecords {
    pub all_time: BTreeMap<GameMode, ScoreEntry>,
    pub monthly: BTreeMap<GameMode, ScoreEntry>,
}
