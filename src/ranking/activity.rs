//! Daily completed-map totals for the activity chart

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;

/// Days covered by the activity series
pub const ACTIVITY_DAYS: u32 = 30;

/// One value per day starting at `start`, oldest first. Missing days are zero.
pub fn daily_series(totals: &[(NaiveDate, i64)], start: DateTime<Utc>, days: u32) -> Vec<i64> {
    let lookup: HashMap<NaiveDate, i64> = totals.iter().copied().collect();

    (0..days)
        .map(|offset| {
            let day = (start + Duration::days(i64::from(offset))).date_naive();
            lookup.get(&day).copied().unwrap_or(0)
        })
        .collect()
}
