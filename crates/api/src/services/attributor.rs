//! Join attribution and role granting.
//!
//! An admitted join is attributed by comparing live invite counters with
//! the stored ones (see [`find_consumed_invite`]). The matched invite's role
//! is granted and one use is claimed in the store. Members held by
//! membership screening are parked in the [`PendingSet`] and attributed
//! when screening clears.
//!
//! Member events are handled in two steps. [`Attributor::admit`] and
//! [`Attributor::screen`] apply the Pending Set transition without awaiting,
//! so a caller that runs them in event order keeps a member's arrival ahead
//! of their ungating. [`Attributor::complete`] then does the remote work.
//!
//! Two joins landing in the same interval can both observe the same counter
//! drift and both be granted the same invite's role. The claimed counter is
//! capped at the live value, so the store never runs ahead of the platform.

use std::sync::Arc;

use domain::services::{
    find_consumed_invite, AttributionMatch, GatewayError, InviteGateway, PendingMember, PendingSet,
};
use persistence::repositories::{DefaultRoleRepository, InviteRepository};
use tracing::{debug, error, info, warn};

use crate::middleware::metrics::{record_attribution, record_role_grant_failure, record_self_heal};

/// What happened to one join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// The member is gated; attribution waits for screening to clear.
    Deferred,
    /// The matched invite's role was granted and a use claimed.
    Granted { invite_id: String, role_id: i64 },
    /// The matched invite has no role, or its role no longer exists; the
    /// record was removed.
    SelfHealed {
        invite_id: String,
        role_id: Option<i64>,
    },
    /// The grant was refused or failed; the counter was left for a retry.
    GrantFailed { invite_id: String, role_id: i64 },
    /// No stored counter moved.
    NoMatch,
    /// Live invites or stored records could not be read.
    Unavailable,
}

impl Attribution {
    /// Metric label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Attribution::Deferred => "deferred",
            Attribution::Granted { .. } => "granted",
            Attribution::SelfHealed { .. } => "self_healed",
            Attribution::GrantFailed { .. } => "grant_failed",
            Attribution::NoMatch => "no_match",
            Attribution::Unavailable => "unavailable",
        }
    }
}

/// Pending Set transition of a member event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Arrived gated and parked in the Pending Set.
    Deferred,
    /// Arrived ungated.
    Admitted,
    /// Released from the Pending Set.
    Resumed,
}

pub struct Attributor {
    invites: InviteRepository,
    default_roles: DefaultRoleRepository,
    gateway: Arc<dyn InviteGateway>,
    pending: PendingSet,
    default_role_while_pending: bool,
}

impl Attributor {
    pub fn new(
        invites: InviteRepository,
        default_roles: DefaultRoleRepository,
        gateway: Arc<dyn InviteGateway>,
        default_role_while_pending: bool,
    ) -> Self {
        Self {
            invites,
            default_roles,
            gateway,
            pending: PendingSet::new(),
            default_role_while_pending,
        }
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// Handles a member joining a community.
    pub async fn member_arrived(
        &self,
        community_id: &str,
        member_id: i64,
        pending: bool,
    ) -> Attribution {
        let admission = self.admit(community_id, member_id, pending);
        self.complete(community_id, member_id, admission).await
    }

    /// Handles a member state change.
    ///
    /// Resumes attribution only when a member recorded as pending is now
    /// admitted; returns `None` otherwise. Duplicate notifications resume it
    /// once.
    pub async fn member_updated(
        &self,
        community_id: &str,
        member_id: i64,
        pending: bool,
    ) -> Option<Attribution> {
        let admission = self.screen(community_id, member_id, pending)?;
        Some(self.complete(community_id, member_id, admission).await)
    }

    /// Records an arrival in the Pending Set if the member is gated.
    pub fn admit(&self, community_id: &str, member_id: i64, pending: bool) -> Admission {
        if pending {
            self.pending
                .insert(PendingMember::new(community_id, member_id));
            debug!(community_id = %community_id, member_id, "Member gated, deferring attribution");
            Admission::Deferred
        } else {
            Admission::Admitted
        }
    }

    /// Releases a member from the Pending Set once screening clears.
    pub fn screen(&self, community_id: &str, member_id: i64, pending: bool) -> Option<Admission> {
        if pending
            || !self
                .pending
                .release(&PendingMember::new(community_id, member_id))
        {
            return None;
        }
        debug!(community_id = %community_id, member_id, "Screening cleared, resuming attribution");
        Some(Admission::Resumed)
    }

    /// Grants the default role and attributes the join, as the admission allows.
    pub async fn complete(
        &self,
        community_id: &str,
        member_id: i64,
        admission: Admission,
    ) -> Attribution {
        match admission {
            Admission::Deferred => {
                if self.default_role_while_pending {
                    self.grant_default_role(community_id, member_id).await;
                }
                record_attribution(Attribution::Deferred.label());
                Attribution::Deferred
            }
            Admission::Admitted => {
                self.grant_default_role(community_id, member_id).await;
                self.attribute(community_id, member_id).await
            }
            Admission::Resumed => {
                if !self.default_role_while_pending {
                    self.grant_default_role(community_id, member_id).await;
                }
                self.attribute(community_id, member_id).await
            }
        }
    }

    /// Attributes an admitted join to an invite and grants its role.
    pub async fn attribute(&self, community_id: &str, member_id: i64) -> Attribution {
        let outcome = self.try_attribute(community_id, member_id).await;
        record_attribution(outcome.label());
        outcome
    }

    async fn try_attribute(&self, community_id: &str, member_id: i64) -> Attribution {
        let live = match self.gateway.list_invites(community_id).await {
            Ok(live) => live,
            Err(err) => {
                if err.is_permission_denied() {
                    warn!(community_id = %community_id, member_id, "Cannot read invites: {}", err);
                } else {
                    error!(community_id = %community_id, member_id, "Failed to fetch invites: {}", err);
                }
                return Attribution::Unavailable;
            }
        };

        let stored = match self.invites.load(community_id).await {
            Ok(stored) => stored,
            Err(err) => {
                error!(community_id = %community_id, member_id, "Failed to load invites: {}", err);
                return Attribution::Unavailable;
            }
        };

        let Some(matched) = find_consumed_invite(&stored, &live) else {
            debug!(community_id = %community_id, member_id, "No invite counter moved");
            return Attribution::NoMatch;
        };

        let Some(role_id) = matched.role_id else {
            return self.self_heal(community_id, matched.invite_id, None).await;
        };

        match self.gateway.role_exists(community_id, role_id).await {
            Ok(true) => {}
            Ok(false) => {
                return self
                    .self_heal(community_id, matched.invite_id, Some(role_id))
                    .await
            }
            Err(err) => {
                error!(
                    community_id = %community_id,
                    invite_id = %matched.invite_id,
                    role_id,
                    "Failed to resolve role: {}",
                    err
                );
                record_role_grant_failure("invite");
                return Attribution::GrantFailed {
                    invite_id: matched.invite_id,
                    role_id,
                };
            }
        }

        if let Err(err) = self.gateway.add_role(community_id, member_id, role_id).await {
            log_grant_failure(community_id, member_id, role_id, &err);
            record_role_grant_failure("invite");
            return Attribution::GrantFailed {
                invite_id: matched.invite_id,
                role_id,
            };
        }

        self.claim_use(community_id, &matched).await;
        info!(
            community_id = %community_id,
            member_id,
            invite_id = %matched.invite_id,
            role_id,
            "Granted invite role"
        );
        Attribution::Granted {
            invite_id: matched.invite_id,
            role_id,
        }
    }

    async fn claim_use(&self, community_id: &str, matched: &AttributionMatch) {
        match self
            .invites
            .increment_uses(&matched.invite_id, matched.live_uses)
            .await
        {
            Ok(Some(uses)) => debug!(
                community_id = %community_id,
                invite_id = %matched.invite_id,
                from = matched.stored_uses,
                uses,
                "Claimed invite use"
            ),
            Ok(None) => debug!(
                community_id = %community_id,
                invite_id = %matched.invite_id,
                "Invite removed before its use was claimed"
            ),
            Err(err) => error!(
                community_id = %community_id,
                invite_id = %matched.invite_id,
                "Failed to record invite use: {}",
                err
            ),
        }
    }

    async fn self_heal(
        &self,
        community_id: &str,
        invite_id: String,
        role_id: Option<i64>,
    ) -> Attribution {
        warn!(
            community_id = %community_id,
            invite_id = %invite_id,
            role_id = ?role_id,
            "Invite role does not resolve, removing invite"
        );
        if let Err(err) = self.invites.remove(&invite_id).await {
            error!(community_id = %community_id, invite_id = %invite_id, "Failed to remove invite: {}", err);
        } else {
            record_self_heal();
        }
        Attribution::SelfHealed { invite_id, role_id }
    }

    /// Grants the community's default role, if one is configured and exists.
    ///
    /// Failures are logged and never affect attribution.
    async fn grant_default_role(&self, community_id: &str, member_id: i64) {
        let role_id = match self.default_roles.get(community_id).await {
            Ok(Some(role_id)) => role_id,
            Ok(None) => return,
            Err(err) => {
                error!(community_id = %community_id, member_id, "Failed to load default role: {}", err);
                return;
            }
        };

        match self.gateway.role_exists(community_id, role_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(community_id = %community_id, role_id, "Default role no longer exists");
                return;
            }
            Err(err) => {
                error!(community_id = %community_id, role_id, "Failed to resolve default role: {}", err);
                record_role_grant_failure("default");
                return;
            }
        }

        match self.gateway.add_role(community_id, member_id, role_id).await {
            Ok(()) => info!(community_id = %community_id, member_id, role_id, "Granted default role"),
            Err(err) => {
                log_grant_failure(community_id, member_id, role_id, &err);
                record_role_grant_failure("default");
            }
        }
    }
}

fn log_grant_failure(community_id: &str, member_id: i64, role_id: i64, err: &GatewayError) {
    if err.is_permission_denied() {
        warn!(community_id = %community_id, member_id, role_id, "Role grant refused: {}", err);
    } else {
        error!(community_id = %community_id, member_id, role_id, "Role grant failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Attribution::Deferred.label(), "deferred");
        assert_eq!(Attribution::NoMatch.label(), "no_match");
        assert_eq!(
            Attribution::Granted {
                invite_id: "a".into(),
                role_id: 1
            }
            .label(),
            "granted"
        );
        assert_eq!(
            Attribution::SelfHealed {
                invite_id: "a".into(),
                role_id: None
            }
            .label(),
            "self_healed"
        );
    }
}
