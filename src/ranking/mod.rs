//! Ranking queries
//!
//! - `leaderboard` - best score per player, dense ranks
//! - `world_records` - best score per ranked mode
//! - `period` - calendar months and leaderboard periods
//! - `activity` - daily completed-map series
//! - `ranker` - datastore-backed service tying them together

pub mod activity;
pub mod leaderboard;
pub mod period;
pub mod ranker;
pub mod world_records;

pub use activity::{ACTIVITY_DAYS, daily_series};
pub use leaderboard::{LEADERBOARD_LIMIT, RankedEntry, assign_dense_ranks, best_per_player};
pub use period::{EARLIEST_MONTH, Month, Period, PeriodError};
pub use ranker::{Leaderboard, Ranker};
pub use world_records::{WorldRecords, best_per_mode};
