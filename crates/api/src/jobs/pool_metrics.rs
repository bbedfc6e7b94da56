//! Periodic store gauges.

use sqlx::SqlitePool;

use super::scheduler::{Job, JobFrequency};

/// Publishes pool occupancy and the tracked invite count.
pub struct PoolMetricsJob {
    pool: SqlitePool,
}

impl PoolMetricsJob {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "store_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(30)
    }

    fn quiet(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), String> {
        persistence::metrics::record_store_metrics(&self.pool)
            .await
            .map_err(|e| format!("Failed to read store metrics: {}", e))
    }
}
