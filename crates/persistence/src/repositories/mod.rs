//! Repository implementations for database operations.

pub mod default_role;
pub mod invite;

pub use default_role::DefaultRoleRepository;
pub use invite::InviteRepository;
