//! Background job scheduler and job implementations.

mod pool_metrics;
mod reconcile_invites;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use reconcile_invites::ReconcileInvitesJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
