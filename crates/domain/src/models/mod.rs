//! Domain models for the role invite service.

pub mod event;
pub mod invite;
pub mod message;

pub use event::PlatformEvent;
pub use invite::{
    invite_url, remote_max_uses, CreateRoleInviteRequest, DefaultRole, InviteRecord,
    InviteSummary, ListInvitesResponse, LiveInvite, RoleInviteResponse, SetDefaultRoleRequest,
    UpdateInviteUsesRequest,
};
pub use message::{
    select_purgeable, ChannelMessage, MessageFilter, PurgeRequest, PurgeResponse,
    BULK_DELETE_MAX_AGE_DAYS,
};
