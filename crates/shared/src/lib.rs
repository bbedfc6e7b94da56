//! Shared utilities and common types for the role invite service.
//!
//! This crate provides common functionality used across all other crates:
//! - Admin key hashing and verification
//! - Human-readable duration parsing (`10m`, `1.5h`)
//! - Common validation logic

pub mod crypto;
pub mod duration;
pub mod validation;
