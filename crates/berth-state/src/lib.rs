//! Job tracking and status reconciliation for berth.
//!
//! A [`Reconciler`] owns the set of submitted jobs, polls SLURM through a
//! [`berth_slurm::StatusSource`] and reports terminal jobs to a
//! [`JobReporter`].

pub mod interval;
pub mod limiter;
pub mod reconcile;
pub mod types;

pub use interval::AdaptiveInterval;
pub use limiter::RateLimiter;
pub use reconcile::{ReconcileConfig, Reconciler, TickOutcome};
pub use types::{FinishedJob, JobReport, JobReporter, JobStatus, SubmittedJob, ToJobStatus};
