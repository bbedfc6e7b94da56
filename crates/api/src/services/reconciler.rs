//! Periodic invite reconciliation.
//!
//! Converges the stored invite set of every community the bot belongs to
//! towards the live remote set: live invites unknown locally are inserted
//! with no role, stored invites that vanished remotely are removed. A
//! community whose listing cannot be fetched is skipped without touching
//! its records, and never blocks the others.

use std::sync::Arc;

use domain::services::{plan_reconciliation, GatewayError, InviteGateway};
use persistence::repositories::InviteRepository;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::middleware::metrics::{record_community_skipped, record_reconciliation};

/// Totals of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Communities whose records were brought in line.
    pub synced: usize,
    /// Communities left untouched because of a failure.
    pub skipped: usize,
    pub added: usize,
    pub removed: usize,
}

/// Failure of a whole pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to list communities: {0}")]
    Communities(#[from] GatewayError),
}

/// Failure confined to one community.
#[derive(Debug, Error)]
pub enum CommunitySyncError {
    #[error("failed to fetch live invites: {0}")]
    Fetch(#[from] GatewayError),

    #[error("invite store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl CommunitySyncError {
    fn reason(&self) -> &'static str {
        match self {
            CommunitySyncError::Fetch(e) if e.is_permission_denied() => "forbidden",
            CommunitySyncError::Fetch(_) => "fetch_failed",
            CommunitySyncError::Store(_) => "store_failed",
        }
    }
}

pub struct Reconciler {
    invites: InviteRepository,
    gateway: Arc<dyn InviteGateway>,
}

impl Reconciler {
    pub fn new(invites: InviteRepository, gateway: Arc<dyn InviteGateway>) -> Self {
        Self { invites, gateway }
    }

    /// Runs one pass over every community the bot is in.
    pub async fn run_pass(&self) -> Result<ReconcileReport, ReconcileError> {
        let communities = self.gateway.communities().await?;
        let mut report = ReconcileReport::default();

        for community_id in &communities {
            match self.reconcile_community(community_id).await {
                Ok((added, removed)) => {
                    report.synced += 1;
                    report.added += added;
                    report.removed += removed;
                }
                Err(err) => {
                    report.skipped += 1;
                    record_community_skipped(err.reason());
                    match &err {
                        CommunitySyncError::Fetch(e) if e.is_permission_denied() => {
                            warn!(community_id = %community_id, "Skipping community: {}", err)
                        }
                        _ => error!(community_id = %community_id, "Skipping community: {}", err),
                    }
                }
            }
        }

        record_reconciliation(report.added, report.removed);
        if report.added > 0 || report.removed > 0 || report.skipped > 0 {
            info!(
                synced = report.synced,
                skipped = report.skipped,
                added = report.added,
                removed = report.removed,
                "Reconciliation pass finished"
            );
        }
        Ok(report)
    }

    /// Brings one community's records in line with its live invites.
    ///
    /// Returns the number of records added and removed.
    pub async fn reconcile_community(
        &self,
        community_id: &str,
    ) -> Result<(usize, usize), CommunitySyncError> {
        let live = self.gateway.list_invites(community_id).await?;
        let stored = self.invites.load(community_id).await?;
        let plan = plan_reconciliation(community_id, &live, &stored);
        if plan.is_empty() {
            return Ok((0, 0));
        }

        let mut added = 0;
        for record in &plan.to_add {
            // A record stored since the load (an admin-created invite) keeps its role.
            if self.invites.insert_if_missing(record).await? {
                debug!(community_id = %community_id, invite_id = %record.invite_id, "Discovered invite");
                added += 1;
            }
        }

        let mut removed = 0;
        for invite_id in &plan.to_remove {
            if self.invites.remove(invite_id).await? > 0 {
                debug!(community_id = %community_id, invite_id = %invite_id, "Dropped vanished invite");
                removed += 1;
            }
        }

        Ok((added, removed))
    }
}
