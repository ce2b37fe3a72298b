//! SLURM job state tokens.

use serde::Serialize;
use std::collections::HashMap;

/// One status query's mapping of job id to raw state token.
pub type StatusSnapshot = HashMap<String, String>;

/// State tokens that mean a job failed.
pub const FAILED_STATES: &[&str] = &[
    "BOOT_FAIL",
    "CANCELLED",
    "DEADLINE",
    "FAILED",
    "NODE_FAIL",
    "OUT_OF_MEMORY",
    "TIMEOUT",
    "ERROR",
];

/// SLURM job state, reduced to what reconciliation acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SlurmJobState {
    Pending,
    Running,
    Completed,
    /// Terminal failure; carries the original token
    Failed(String),
    Preempted,
    /// The scheduler no longer knows the job
    Unknown,
    /// Any other non-terminal token (CONFIGURING, SUSPENDED, ...)
    Other(String),
}

impl SlurmJobState {
    /// Classify a state token. Only the first whitespace-delimited word
    /// counts, so "CANCELLED by 1234" is a failure.
    pub fn from_token(token: &str) -> Self {
        let token = token.split_whitespace().next().unwrap_or_default();
        match token.to_uppercase().as_str() {
            "PENDING" | "REQUEUED" => Self::Pending,
            "RUNNING" | "COMPLETING" => Self::Running,
            "COMPLETED" => Self::Completed,
            "PREEMPTED" => Self::Preempted,
            "UNKNOWN" => Self::Unknown,
            failed if FAILED_STATES.contains(&failed) => Self::Failed(failed.to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the state is final by itself.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}
