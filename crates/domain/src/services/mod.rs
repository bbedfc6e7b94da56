//! Domain services for the role invite service.
//!
//! Services contain the policies that decide what the reconciler and the
//! attributor do; the api crate wires them to the store and the gateway.

pub mod attribution;
pub mod gateway;
pub mod pending;
pub mod reconciliation;

pub use attribution::{find_consumed_invite, AttributionMatch};
pub use gateway::{
    GatewayError, InMemoryGateway, InviteGateway, InviteParams, RoleGrant,
};
pub use pending::{PendingMember, PendingSet};
pub use reconciliation::{plan_reconciliation, ReconcilePlan};
