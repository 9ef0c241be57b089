//! Usage counters reported by the plugin
//!
//! Only allow-listed names are counted. Counters are bucketed per UTC day by
//! the datastore.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::database::Datastore;
use crate::error::{ApiError, StoreError};

/// Names accepted when `ALLOWED_METRICS` is not set
pub const DEFAULT_ALLOWED_METRICS: &[&str] = &[
    "run_started",
    "run_finished",
    "map_completed",
    "map_skipped",
    "medal_author",
    "medal_gold",
];

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("metric name not allowed")]
    NotAllowed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MetricError> for ApiError {
    fn from(err: MetricError) -> Self {
        match err {
            MetricError::NotAllowed => ApiError::NotAllowed(MetricError::NotAllowed.to_string()),
            MetricError::Store(cause) => ApiError::unavailable(cause),
        }
    }
}

pub struct MetricsRecorder {
    store: Arc<dyn Datastore>,
    allowed: HashSet<String>,
}

impl MetricsRecorder {
    pub fn new<I, S>(store: Arc<dyn Datastore>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            store,
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }

    /// Add `increment` to today's counter. Non-positive increments count as one.
    pub async fn record(&self, name: &str, increment: i64) -> Result<(), MetricError> {
        if !self.is_allowed(name) {
            return Err(MetricError::NotAllowed);
        }
        let increment = if increment <= 0 { 1 } else { increment };

        self.store.increment_metric(name, increment).await?;
        debug!(metric = name, increment, "Metric recorded");
        Ok(())
    }
}
