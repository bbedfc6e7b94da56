//! Persistence layer for the role invite service.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations (the invite store)

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
