//! Platform event dispatch.
//!
//! Events arrive on a bounded queue and each one is handled on its own
//! task, so a slow role grant never holds up the next join. A member's
//! Pending Set transition is applied in the receive loop before the task is
//! spawned, so an ungating event never overtakes the arrival it releases.
//! Handlers log their failures; nothing propagates back to the queue.

use std::sync::Arc;

use domain::models::{InviteRecord, LiveInvite, PlatformEvent};
use persistence::repositories::InviteRepository;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};

use super::attributor::{Admission, Attributor};

/// An event whose ordering-sensitive part has already been applied.
enum Prepared {
    Member {
        community_id: String,
        member_id: i64,
        admission: Admission,
    },
    /// An update that released nobody.
    Ignored,
    InviteCreated {
        community_id: String,
        invite: LiveInvite,
    },
    InviteDeleted {
        invite_id: String,
    },
}

pub struct EventDispatcher {
    attributor: Arc<Attributor>,
    invites: InviteRepository,
}

impl EventDispatcher {
    pub fn new(attributor: Arc<Attributor>, invites: InviteRepository) -> Self {
        Self {
            attributor,
            invites,
        }
    }

    /// Consumes the queue until every sender is dropped, then waits for the
    /// handlers still running.
    pub fn spawn(self: Arc<Self>, mut events: mpsc::Receiver<PlatformEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut in_flight = tokio::task::JoinSet::new();
            loop {
                tokio::select! {
                    received = events.recv() => {
                        let Some(event) = received else { break };
                        let span = tracing::info_span!(
                            "event",
                            kind = event.kind(),
                            community_id = %event.community_id()
                        );
                        let prepared = span.in_scope(|| self.prepare(event));
                        let dispatcher = Arc::clone(&self);
                        in_flight.spawn(async move { dispatcher.run(prepared).await }.instrument(span));
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(err) = joined {
                            error!("Event handler panicked: {}", err);
                        }
                    }
                }
            }
            while in_flight.join_next().await.is_some() {}
            info!("Event queue closed");
        })
    }

    /// Handles a single event.
    pub async fn handle(&self, event: PlatformEvent) {
        let prepared = self.prepare(event);
        self.run(prepared).await;
    }

    /// Applies the Pending Set transition of a member event. Never awaits.
    fn prepare(&self, event: PlatformEvent) -> Prepared {
        match event {
            PlatformEvent::MemberArrived {
                community_id,
                member_id,
                pending,
            } => {
                let admission = self.attributor.admit(&community_id, member_id, pending);
                Prepared::Member {
                    community_id,
                    member_id,
                    admission,
                }
            }
            PlatformEvent::MemberUpdated {
                community_id,
                member_id,
                pending,
            } => match self.attributor.screen(&community_id, member_id, pending) {
                Some(admission) => Prepared::Member {
                    community_id,
                    member_id,
                    admission,
                },
                None => Prepared::Ignored,
            },
            PlatformEvent::InviteCreated {
                community_id,
                invite,
            } => Prepared::InviteCreated {
                community_id,
                invite,
            },
            PlatformEvent::InviteDeleted { invite_id, .. } => Prepared::InviteDeleted { invite_id },
        }
    }

    async fn run(&self, prepared: Prepared) {
        match prepared {
            Prepared::Member {
                community_id,
                member_id,
                admission,
            } => {
                let outcome = self
                    .attributor
                    .complete(&community_id, member_id, admission)
                    .await;
                debug!(member_id, outcome = outcome.label(), "Member event handled");
            }
            Prepared::Ignored => {}
            Prepared::InviteCreated {
                community_id,
                invite,
            } => {
                let mut record = InviteRecord::discovered(&community_id, &invite);
                record.duration_seconds = Some(invite.max_age);
                match self.invites.insert_if_missing(&record).await {
                    Ok(true) => debug!(invite_id = %record.invite_id, "Tracked new invite"),
                    Ok(false) => debug!(invite_id = %record.invite_id, "Invite already tracked"),
                    Err(err) => {
                        error!(invite_id = %record.invite_id, "Failed to track invite: {}", err)
                    }
                }
            }
            Prepared::InviteDeleted { invite_id } => match self.invites.remove(&invite_id).await {
                Ok(removed) => debug!(invite_id = %invite_id, removed, "Invite deleted"),
                Err(err) => error!(invite_id = %invite_id, "Failed to remove invite: {}", err),
            },
        }
    }
}
