//! Members held behind membership screening.
//!
//! The set lives for the lifetime of the process only. A restart while
//! members are pending drops their deferred attribution; those members do
//! not receive an invite role through this path.

use std::collections::HashSet;
use std::sync::Mutex;

/// A member whose role grant waits for screening to clear.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingMember {
    pub community_id: String,
    pub member_id: i64,
}

impl PendingMember {
    pub fn new(community_id: impl Into<String>, member_id: i64) -> Self {
        Self {
            community_id: community_id.into(),
            member_id,
        }
    }
}

/// In-memory set of pending members.
#[derive(Debug, Default)]
pub struct PendingSet {
    members: Mutex<HashSet<PendingMember>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a gated member. Returns false if already pending.
    pub fn insert(&self, member: PendingMember) -> bool {
        self.lock().insert(member)
    }

    /// Removes a member whose screening cleared.
    ///
    /// Returns true only for the caller that actually removed the entry, so
    /// duplicate ungating events resume attribution once.
    pub fn release(&self, member: &PendingMember) -> bool {
        self.lock().remove(member)
    }

    pub fn contains(&self, member: &PendingMember) -> bool {
        self.lock().contains(member)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PendingMember>> {
        // Poisoning is ignored: entries are plain values.
        self.members.lock().unwrap_or_else(|e| e.into_inner())
    }
}
