//! Reconciliation planning.
//!
//! Computes the repairs needed to bring one community's stored invites in
//! line with its live invite listing. Plans are always per community: a
//! community whose listing could not be fetched gets no plan at all, so its
//! stored invites are never treated as absent.

use std::collections::HashSet;

use crate::models::{InviteRecord, LiveInvite};

/// Repairs for a single community.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Live invites with no local record, to insert with unknown role.
    pub to_add: Vec<InviteRecord>,
    /// Stored invite ids no longer present remotely.
    pub to_remove: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diffs a community's live invites against its stored invites.
///
/// Existing records are left untouched: their role mapping and use counter
/// are owned by explicit configuration and attribution.
pub fn plan_reconciliation(
    community_id: &str,
    live: &[LiveInvite],
    stored: &[InviteRecord],
) -> ReconcilePlan {
    let stored_ids: HashSet<&str> = stored.iter().map(|r| r.invite_id.as_str()).collect();
    let live_ids: HashSet<&str> = live.iter().map(|i| i.id.as_str()).collect();

    let to_add = live
        .iter()
        .filter(|invite| !stored_ids.contains(invite.id.as_str()))
        .map(|invite| InviteRecord::discovered(community_id, invite))
        .collect();

    let to_remove = stored
        .iter()
        .filter(|record| record.community_id == community_id)
        .filter(|record| !live_ids.contains(record.invite_id.as_str()))
        .map(|record| record.invite_id.clone())
        .collect();

    ReconcilePlan { to_add, to_remove }
}
