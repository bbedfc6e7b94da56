//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod default_role;
pub mod invite;

pub use default_role::DefaultRoleEntity;
pub use invite::InviteEntity;
