//! Platform events consumed by the service.

use serde::{Deserialize, Serialize};

use super::invite::LiveInvite;

/// An event observed on the remote platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// A member joined. `pending` is set while membership screening is outstanding.
    MemberArrived {
        community_id: String,
        member_id: i64,
        pending: bool,
    },
    /// A member's state changed; used to observe screening clearing.
    MemberUpdated {
        community_id: String,
        member_id: i64,
        pending: bool,
    },
    InviteCreated {
        community_id: String,
        invite: LiveInvite,
    },
    InviteDeleted {
        community_id: String,
        invite_id: String,
    },
}

impl PlatformEvent {
    pub fn community_id(&self) -> &str {
        match self {
            PlatformEvent::MemberArrived { community_id, .. }
            | PlatformEvent::MemberUpdated { community_id, .. }
            | PlatformEvent::InviteCreated { community_id, .. }
            | PlatformEvent::InviteDeleted { community_id, .. } => community_id,
        }
    }

    /// Short name used as a log field and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformEvent::MemberArrived { .. } => "member_arrived",
            PlatformEvent::MemberUpdated { .. } => "member_updated",
            PlatformEvent::InviteCreated { .. } => "invite_created",
            PlatformEvent::InviteDeleted { .. } => "invite_deleted",
        }
    }
}
