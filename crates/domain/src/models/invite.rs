//! Invite domain models for role invites.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Locally tracked invite and the role it grants.
///
/// `uses` mirrors the remote usage counter as last observed by this service.
/// It may lag the remote counter but must never exceed it after a completed
/// reconciliation or attribution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteRecord {
    pub invite_id: String,
    pub community_id: String,
    /// Role granted on use. `None` until explicitly configured.
    pub role_id: Option<i64>,
    pub creator_id: i64,
    pub uses: i64,
    /// 0 means unlimited.
    pub max_uses: i64,
    /// 0 means no expiry, `None` means unknown (discovered remotely).
    pub duration_seconds: Option<i64>,
    pub channel_id: Option<i64>,
}

impl InviteRecord {
    /// Builds a record for an invite seen remotely but unknown locally.
    ///
    /// Role and duration are not knowable from the live listing.
    pub fn discovered(community_id: &str, live: &LiveInvite) -> Self {
        Self {
            invite_id: live.id.clone(),
            community_id: community_id.to_string(),
            role_id: None,
            creator_id: live.creator_id.unwrap_or_default(),
            uses: live.uses,
            max_uses: live.max_uses,
            duration_seconds: None,
            channel_id: live.channel_id,
        }
    }

    /// Formats the remaining-uses column for listings.
    pub fn uses_display(&self) -> String {
        if self.max_uses > 0 {
            format!("{} / {}", self.uses, self.max_uses)
        } else {
            format!("{} / ∞", self.uses)
        }
    }
}

/// An invite as reported by the remote platform, with its live counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LiveInvite {
    /// Invite code; platform-unique across communities.
    pub id: String,
    pub uses: i64,
    #[serde(default)]
    pub max_uses: i64,
    #[serde(default)]
    pub max_age: i64,
    #[serde(default)]
    pub creator_id: Option<i64>,
    #[serde(default)]
    pub channel_id: Option<i64>,
}

/// Default role granted to every admitted member of a community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DefaultRole {
    pub community_id: String,
    pub role_id: i64,
}

/// Request to create a role invite.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateRoleInviteRequest {
    /// Role granted to members who join through the invite.
    #[validate(custom(function = "shared::validation::validate_snowflake"))]
    pub role_id: i64,

    /// Channel the invite points at (default: the community's system channel).
    #[validate(custom(function = "shared::validation::validate_snowflake"))]
    pub channel_id: Option<i64>,

    /// Lifetime such as `10m` or `7d` (default: no expiry).
    #[validate(custom(function = "shared::validation::validate_duration"))]
    pub duration: Option<String>,

    /// Maximum uses (0-100, 0 = unlimited).
    #[validate(range(min = 0, max = 100, message = "max_uses must be between 0 and 100"))]
    pub max_uses: Option<i64>,

    /// Creator recorded against the invite.
    #[validate(custom(function = "shared::validation::validate_snowflake"))]
    pub created_by: i64,
}

/// Request to overwrite the stored use counter of an invite.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateInviteUsesRequest {
    #[validate(range(min = 0, message = "uses cannot be negative"))]
    pub uses: i64,
}

/// Request to set the default role for a community.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SetDefaultRoleRequest {
    #[validate(custom(function = "shared::validation::validate_snowflake"))]
    pub role_id: i64,
}

/// Response after creating a role invite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoleInviteResponse {
    pub invite_id: String,
    pub invite_url: String,
    pub role_id: Option<i64>,
    pub uses: i64,
    pub max_uses: i64,
    pub duration_seconds: Option<i64>,
    pub channel_id: Option<i64>,
}

impl RoleInviteResponse {
    pub fn from_record(record: InviteRecord) -> Self {
        Self {
            invite_url: invite_url(&record.invite_id),
            invite_id: record.invite_id,
            role_id: record.role_id,
            uses: record.uses,
            max_uses: record.max_uses,
            duration_seconds: record.duration_seconds,
            channel_id: record.channel_id,
        }
    }
}

/// Summary of a stored invite for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteSummary {
    pub invite_id: String,
    pub invite_url: String,
    pub role_id: Option<i64>,
    pub uses: String,
}

/// Response for listing invites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListInvitesResponse {
    pub data: Vec<InviteSummary>,
}

impl From<&InviteRecord> for InviteSummary {
    fn from(record: &InviteRecord) -> Self {
        Self {
            invite_id: record.invite_id.clone(),
            invite_url: invite_url(&record.invite_id),
            role_id: record.role_id,
            uses: record.uses_display(),
        }
    }
}

/// Public URL for an invite code.
pub fn invite_url(invite_id: &str) -> String {
    format!("https://discord.gg/{}", invite_id)
}

/// Remote `max_uses` to request for a role invite.
///
/// A single-use invite is deleted by the platform as soon as it is consumed,
/// before its counter can be observed, so it is requested as two-use.
pub fn remote_max_uses(requested: i64) -> i64 {
    if requested == 1 {
        2
    } else {
        requested
    }
}
