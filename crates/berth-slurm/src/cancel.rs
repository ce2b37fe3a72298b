//! Cancel jobs via scancel.

use berth_parsers::{CommandError, run_command_with_timeout};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// scancel is normally instant but can wait on a busy controller for a
/// scheduling cycle or two.
pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum CancelError {
    #[error("Unable to cancel jobs with scancel (exit code {code:?}): {stderr}{hint}")]
    Failed {
        code: Option<i32>,
        stderr: String,
        hint: &'static str,
    },
    #[error("Failed to execute scancel: {0}")]
    ExecutionError(String),
}

const MULTI_CLUSTER_HINT: &str = "\nJob cancellation failed while using --clusters. \
     The multi-cluster SLURM setup may not support this flag, or slurmdbd may not be \
     configured for multi-cluster operation.";

/// scancel arguments for a bulk cancel.
pub fn scancel_args(job_ids: &[String], all_clusters: bool) -> Vec<String> {
    let mut args: Vec<String> = job_ids.to_vec();
    if all_clusters {
        args.push("--clusters=all".to_string());
    }
    args
}

/// Cancel all `job_ids` with a single scancel call.
///
/// A timeout is logged and otherwise ignored; a non-zero exit is an error.
pub async fn cancel_jobs(
    job_ids: &[String],
    all_clusters: bool,
    timeout: Duration,
) -> Result<(), CancelError> {
    if job_ids.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new("scancel");
    cmd.args(scancel_args(job_ids, all_clusters));
    tracing::debug!("cancelling {} jobs", job_ids.len());

    match run_command_with_timeout(&mut cmd, "scancel", timeout).await {
        Ok(_) => {
            tracing::info!("cancelled {} jobs", job_ids.len());
            Ok(())
        }
        Err(CommandError::TimedOut { timeout, .. }) => {
            tracing::warn!("Unable to cancel jobs within {}s", timeout.as_secs());
            Ok(())
        }
        Err(CommandError::Failed { code, stderr, .. }) => Err(CancelError::Failed {
            code,
            stderr,
            hint: if all_clusters { MULTI_CLUSTER_HINT } else { "" },
        }),
        Err(e) => Err(CancelError::ExecutionError(e.to_string())),
    }
}
