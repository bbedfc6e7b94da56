//! Background job running the invite reconciler.

use super::scheduler::{Job, JobFrequency};
use crate::services::Reconciler;

/// Runs one reconciliation pass per tick.
///
/// Per-community failures are absorbed by the pass; the job fails only
/// when the community listing itself cannot be fetched.
pub struct ReconcileInvitesJob {
    reconciler: Reconciler,
    interval_secs: u64,
}

impl ReconcileInvitesJob {
    pub fn new(reconciler: Reconciler, interval_secs: u64) -> Self {
        Self {
            reconciler,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for ReconcileInvitesJob {
    fn name(&self) -> &'static str {
        "reconcile_invites"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    /// Logs quietly: a pass runs every few seconds.
    fn quiet(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), String> {
        self.reconciler
            .run_pass()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
