//! Tracked job and job status types.

use berth_slurm::SlurmJobState;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job status as seen by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Queued, or in a state that will change by itself
    Pending,
    /// Currently running
    Running,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
    /// Preempted; SLURM resumes it
    Preempted,
    /// No longer known to the scheduler
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Trait for converting scheduler-specific states to [`JobStatus`].
pub trait ToJobStatus {
    fn to_job_status(&self) -> JobStatus;
}

impl ToJobStatus for SlurmJobState {
    fn to_job_status(&self) -> JobStatus {
        match self {
            Self::Pending | Self::Other(_) => JobStatus::Pending,
            Self::Running => JobStatus::Running,
            Self::Completed => JobStatus::Completed,
            Self::Failed(_) => JobStatus::Failed,
            Self::Preempted => JobStatus::Preempted,
            Self::Unknown => JobStatus::Unknown,
        }
    }
}

/// A job accepted by SLURM and awaiting a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedJob {
    /// SLURM job id
    pub external_id: String,

    /// Workflow-side job id
    pub logical_id: String,

    pub submit_time: DateTime<Utc>,

    /// SLURM log file
    pub log_path: Option<Utf8PathBuf>,
}

impl SubmittedJob {
    pub fn new(external_id: impl Into<String>, logical_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            logical_id: logical_id.into(),
            submit_time: Utc::now(),
            log_path: None,
        }
    }

    pub fn with_log_path(mut self, log_path: Utf8PathBuf) -> Self {
        self.log_path = Some(log_path);
        self
    }
}

/// Final verdict on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobReport {
    Succeeded,
    Failed { message: String },
}

/// A job that reached a terminal state during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishedJob {
    pub job: SubmittedJob,
    pub report: JobReport,
}

/// Receives the terminal report of every job exactly once.
pub trait JobReporter {
    fn report_success(&mut self, job: &SubmittedJob);

    fn report_failure(&mut self, job: &SubmittedJob, message: &str);
}
