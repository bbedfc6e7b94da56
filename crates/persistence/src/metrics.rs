//! Invite store metrics.

use std::time::Instant;

use metrics::{gauge, histogram};
use sqlx::SqlitePool;

/// Times one store operation; the histogram is labelled with the operation.
#[must_use = "a timer records nothing until `record` is called"]
pub struct QueryTimer {
    operation: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        histogram!("database_query_duration_seconds", "query" => self.operation)
            .record(self.start.elapsed().as_secs_f64());
    }
}

/// Publishes pool occupancy and the number of tracked invites.
pub async fn record_store_metrics(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    gauge!("database_connections_total").set(size as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);

    let tracked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invites")
        .fetch_one(pool)
        .await?;
    gauge!("invites_tracked").set(tracked as f64);
    Ok(())
}
