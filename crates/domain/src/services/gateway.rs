//! Remote platform gateway.
//!
//! The gateway is the only way the service reads or mutates remote state:
//! live invite listings with their usage counters, role grants, and the
//! invite/message mutations used by the admin surface.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use thiserror::Error;

use crate::models::{ChannelMessage, LiveInvite};

/// Error returned by gateway calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The bot lacks permission for the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl GatewayError {
    /// True for refusals that are logged and skipped rather than reported.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, GatewayError::Forbidden(_))
    }
}

/// Parameters for creating a remote invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteParams {
    /// Lifetime in seconds, 0 = no expiry.
    pub max_age_secs: i64,
    /// 0 = unlimited.
    pub max_uses: i64,
    /// Audit log reason.
    pub reason: Option<String>,
}

/// Operations consumed from the remote platform.
#[async_trait::async_trait]
pub trait InviteGateway: Send + Sync {
    /// Communities the bot is currently a member of.
    async fn communities(&self) -> Result<Vec<String>, GatewayError>;

    /// Live invites of a community with their current usage counters.
    async fn list_invites(&self, community_id: &str) -> Result<Vec<LiveInvite>, GatewayError>;

    async fn create_invite(
        &self,
        channel_id: i64,
        params: &InviteParams,
    ) -> Result<LiveInvite, GatewayError>;

    async fn delete_invite(&self, invite_id: &str) -> Result<(), GatewayError>;

    /// Whether a role id still resolves to a role of the community.
    async fn role_exists(&self, community_id: &str, role_id: i64) -> Result<bool, GatewayError>;

    async fn add_role(
        &self,
        community_id: &str,
        member_id: i64,
        role_id: i64,
    ) -> Result<(), GatewayError>;

    /// Channel used for invites when none is given (system channel or first text channel).
    async fn default_channel(&self, community_id: &str) -> Result<Option<i64>, GatewayError>;

    /// Most recent messages of a channel, newest first.
    async fn recent_messages(
        &self,
        channel_id: i64,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, GatewayError>;

    /// Deletes messages, returning how many were removed.
    async fn delete_messages(
        &self,
        channel_id: i64,
        message_ids: &[i64],
    ) -> Result<usize, GatewayError>;
}

/// A role grant recorded by [`InMemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub community_id: String,
    pub member_id: i64,
    pub role_id: i64,
}

#[derive(Debug, Default)]
struct CommunityState {
    invites: Vec<LiveInvite>,
    roles: HashSet<i64>,
    system_channel: Option<i64>,
    invites_forbidden: bool,
}

#[derive(Debug, Default)]
struct GatewayState {
    communities: BTreeMap<String, CommunityState>,
    channels: HashMap<i64, String>,
    messages: HashMap<i64, Vec<ChannelMessage>>,
    grants: Vec<RoleGrant>,
    forbidden_roles: HashSet<i64>,
    next_invite: u64,
}

/// In-memory gateway for development and testing.
///
/// Holds remote state in process and records role grants, so the
/// reconciler and attributor can run without a platform connection.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<GatewayState>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a community with a system channel.
    pub fn add_community(&self, community_id: &str, system_channel: i64) {
        let mut state = self.lock();
        state
            .communities
            .entry(community_id.to_string())
            .or_default()
            .system_channel = Some(system_channel);
        state
            .channels
            .insert(system_channel, community_id.to_string());
    }

    /// Registers an additional channel of a community.
    pub fn add_channel(&self, community_id: &str, channel_id: i64) {
        self.lock()
            .channels
            .insert(channel_id, community_id.to_string());
    }

    pub fn create_role(&self, community_id: &str, role_id: i64) {
        self.lock()
            .communities
            .entry(community_id.to_string())
            .or_default()
            .roles
            .insert(role_id);
    }

    pub fn delete_role(&self, community_id: &str, role_id: i64) {
        if let Some(community) = self.lock().communities.get_mut(community_id) {
            community.roles.remove(&role_id);
        }
    }

    /// Adds or replaces a live invite.
    pub fn put_invite(&self, community_id: &str, invite: LiveInvite) {
        let mut state = self.lock();
        let community = state
            .communities
            .entry(community_id.to_string())
            .or_default();
        community.invites.retain(|i| i.id != invite.id);
        community.invites.push(invite);
    }

    pub fn remove_invite(&self, community_id: &str, invite_id: &str) {
        if let Some(community) = self.lock().communities.get_mut(community_id) {
            community.invites.retain(|i| i.id != invite_id);
        }
    }

    /// Simulates `count` joins through an invite.
    pub fn record_uses(&self, invite_id: &str, count: i64) {
        let mut state = self.lock();
        for community in state.communities.values_mut() {
            if let Some(invite) = community.invites.iter_mut().find(|i| i.id == invite_id) {
                invite.uses += count;
            }
        }
    }

    /// Makes invite listings of a community fail with a permission error.
    pub fn deny_invite_access(&self, community_id: &str, denied: bool) {
        self.lock()
            .communities
            .entry(community_id.to_string())
            .or_default()
            .invites_forbidden = denied;
    }

    /// Makes grants of a role fail with a permission error.
    pub fn deny_role_grants(&self, role_id: i64) {
        self.lock().forbidden_roles.insert(role_id);
    }

    pub fn add_message(&self, channel_id: i64, message: ChannelMessage) {
        self.lock()
            .messages
            .entry(channel_id)
            .or_default()
            .insert(0, message);
    }

    /// Role grants performed so far, in order.
    pub fn grants(&self) -> Vec<RoleGrant> {
        self.lock().grants.clone()
    }

    pub fn live_invites(&self, community_id: &str) -> Vec<LiveInvite> {
        self.lock()
            .communities
            .get(community_id)
            .map(|c| c.invites.clone())
            .unwrap_or_default()
    }

    pub fn message_count(&self, channel_id: i64) -> usize {
        self.lock()
            .messages
            .get(&channel_id)
            .map(Vec::len)
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl InviteGateway for InMemoryGateway {
    async fn communities(&self) -> Result<Vec<String>, GatewayError> {
        Ok(self.lock().communities.keys().cloned().collect())
    }

    async fn list_invites(&self, community_id: &str) -> Result<Vec<LiveInvite>, GatewayError> {
        let state = self.lock();
        let community = state
            .communities
            .get(community_id)
            .ok_or_else(|| GatewayError::NotFound(format!("community {}", community_id)))?;
        if community.invites_forbidden {
            return Err(GatewayError::Forbidden("Missing Manage Server".to_string()));
        }
        Ok(community.invites.clone())
    }

    async fn create_invite(
        &self,
        channel_id: i64,
        params: &InviteParams,
    ) -> Result<LiveInvite, GatewayError> {
        let mut state = self.lock();
        let community_id = state
            .channels
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("channel {}", channel_id)))?;
        state.next_invite += 1;
        let invite = LiveInvite {
            id: format!("inv{:05}", state.next_invite),
            uses: 0,
            max_uses: params.max_uses,
            max_age: params.max_age_secs,
            creator_id: None,
            channel_id: Some(channel_id),
        };
        state
            .communities
            .entry(community_id)
            .or_default()
            .invites
            .push(invite.clone());
        Ok(invite)
    }

    async fn delete_invite(&self, invite_id: &str) -> Result<(), GatewayError> {
        let mut state = self.lock();
        let mut found = false;
        for community in state.communities.values_mut() {
            let before = community.invites.len();
            community.invites.retain(|i| i.id != invite_id);
            found |= community.invites.len() != before;
        }
        if found {
            Ok(())
        } else {
            Err(GatewayError::NotFound(format!("invite {}", invite_id)))
        }
    }

    async fn role_exists(&self, community_id: &str, role_id: i64) -> Result<bool, GatewayError> {
        Ok(self
            .lock()
            .communities
            .get(community_id)
            .map(|c| c.roles.contains(&role_id))
            .unwrap_or(false))
    }

    async fn add_role(
        &self,
        community_id: &str,
        member_id: i64,
        role_id: i64,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if state.forbidden_roles.contains(&role_id) {
            return Err(GatewayError::Forbidden(
                "Role is above the bot's highest role".to_string(),
            ));
        }
        let exists = state
            .communities
            .get(community_id)
            .map(|c| c.roles.contains(&role_id))
            .unwrap_or(false);
        if !exists {
            return Err(GatewayError::NotFound(format!("role {}", role_id)));
        }
        state.grants.push(RoleGrant {
            community_id: community_id.to_string(),
            member_id,
            role_id,
        });
        Ok(())
    }

    async fn default_channel(&self, community_id: &str) -> Result<Option<i64>, GatewayError> {
        Ok(self
            .lock()
            .communities
            .get(community_id)
            .and_then(|c| c.system_channel))
    }

    async fn recent_messages(
        &self,
        channel_id: i64,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, GatewayError> {
        Ok(self
            .lock()
            .messages
            .get(&channel_id)
            .map(|m| m.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_messages(
        &self,
        channel_id: i64,
        message_ids: &[i64],
    ) -> Result<usize, GatewayError> {
        let mut state = self.lock();
        let Some(messages) = state.messages.get_mut(&channel_id) else {
            return Err(GatewayError::NotFound(format!("channel {}", channel_id)));
        };
        let before = messages.len();
        messages.retain(|m| !message_ids.contains(&m.id));
        Ok(before - messages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(id: &str, uses: i64) -> LiveInvite {
        LiveInvite {
            id: id.to_string(),
            uses,
            max_uses: 0,
            max_age: 0,
            creator_id: Some(1),
            channel_id: Some(10),
        }
    }

    #[test]
    fn test_permission_denied_classification() {
        assert!(GatewayError::Forbidden("x".to_string()).is_permission_denied());
        assert!(!GatewayError::NotFound("x".to_string()).is_permission_denied());
        assert!(!GatewayError::RateLimited {
            retry_after_secs: 1
        }
        .is_permission_denied());
    }

    #[tokio::test]
    async fn test_list_invites_and_record_uses() {
        let gateway = InMemoryGateway::new();
        gateway.add_community("g", 10);
        gateway.put_invite("g", invite("a", 0));
        gateway.record_uses("a", 2);

        let invites = gateway.list_invites("g").await.unwrap();
        assert_eq!(invites.len(), 1);
        assert_eq!(invites[0].uses, 2);
    }

    #[tokio::test]
    async fn test_denied_listing() {
        let gateway = InMemoryGateway::new();
        gateway.add_community("g", 10);
        gateway.deny_invite_access("g", true);
        let err = gateway.list_invites("g").await.unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_add_role_records_grant() {
        let gateway = InMemoryGateway::new();
        gateway.add_community("g", 10);
        gateway.create_role("g", 5);

        gateway.add_role("g", 77, 5).await.unwrap();
        assert_eq!(
            gateway.grants(),
            vec![RoleGrant {
                community_id: "g".to_string(),
                member_id: 77,
                role_id: 5,
            }]
        );
    }

    #[tokio::test]
    async fn test_add_role_forbidden() {
        let gateway = InMemoryGateway::new();
        gateway.add_community("g", 10);
        gateway.create_role("g", 5);
        gateway.deny_role_grants(5);
        let err = gateway.add_role("g", 77, 5)
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(gateway.grants().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_delete_invite() {
        let gateway = InMemoryGateway::new();
        gateway.add_community("g", 10);
        let params = InviteParams {
            max_age_secs: 600,
            max_uses: 2,
            reason: None,
        };
        let created = gateway.create_invite(10, &params).await.unwrap();
        assert_eq!(created.max_uses, 2);
        assert_eq!(gateway.live_invites("g").len(), 1);

        gateway.delete_invite(&created.id).await.unwrap();
        assert!(gateway.live_invites("g").is_empty());
        assert!(matches!(
            gateway.delete_invite(&created.id).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_invite_unknown_channel() {
        let gateway = InMemoryGateway::new();
        let params = InviteParams {
            max_age_secs: 0,
            max_uses: 0,
            reason: None,
        };
        assert!(matches!(
            gateway.create_invite(999, &params).await,
            Err(GatewayError::NotFound(_))
        ));
    }
}
