//! API route handlers.

pub mod default_roles;
pub mod events;
pub mod health;
pub mod invites;
pub mod purge;
