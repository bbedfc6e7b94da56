//! Domain layer for the role invite service.
//!
//! This crate contains:
//! - Domain models (InviteRecord, LiveInvite, PlatformEvent, MessageFilter)
//! - The remote gateway abstraction and an in-memory implementation
//! - Attribution and reconciliation policies
//! - The pending (screening-gated) member set

pub mod models;
pub mod services;
