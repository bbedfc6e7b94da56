//! Reconciliation, attribution and the platform integration.

pub mod attributor;
pub mod discord;
pub mod events;
pub mod reconciler;

pub use attributor::{Admission, Attribution, Attributor};
pub use discord::{DiscordGateway, DiscordSetupError};
pub use events::EventDispatcher;
pub use reconciler::{ReconcileError, ReconcileReport, Reconciler};
