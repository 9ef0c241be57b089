//! Metric Repository - daily usage counters

use sqlx::PgPool;
use std::time::Duration;

use super::store::with_timeout;
use crate::error::StoreError;

/// Days are UTC regardless of the session timezone, matching the activity series
const INCREMENT_METRIC: &str = r#"
    INSERT INTO metrics (name, date, count)
    VALUES ($1, (NOW() AT TIME ZONE 'UTC')::date, $2)
    ON CONFLICT (name, date) DO UPDATE SET
        count = metrics.count + EXCLUDED.count
"#;

pub struct MetricRepository {
    pool: PgPool,
    timeout: Duration,
}

impl MetricRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Add to today's counter, creating the row on first use
    pub async fn increment(&self, name: &str, increment: i64) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query(INCREMENT_METRIC)
                .bind(name)
                .bind(increment)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_day_is_utc() {
        assert!(INCREMENT_METRIC.contains("(NOW() AT TIME ZONE 'UTC')::date"));
        assert!(!INCREMENT_METRIC.contains("CURRENT_DATE"));
    }
}
