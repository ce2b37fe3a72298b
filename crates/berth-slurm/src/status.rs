//! Query job states via sacct or squeue.
//!
//! Both commands are filtered by the workflow run id, which is submitted as
//! the job name, and print one `<job id>|<state>` line per job.

use crate::types::StatusSnapshot;
use berth_parsers::{CommandError, run_command_with_timeout};
use chrono::{DateTime, Duration as ChronoDuration, Local};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Marker in stderr when slurmdbd cannot be reached.
const PERSIST_CONN_ERROR: &str = "slurm_persist_conn_open_without_init";

/// Default upper bound on a single status query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum StatusQueryError {
    #[error("SLURM database unavailable: {0}")]
    DatabaseUnavailable(String),
    #[error(transparent)]
    Command(CommandError),
}

impl From<CommandError> for StatusQueryError {
    fn from(err: CommandError) -> Self {
        match err.stderr() {
            Some(stderr) if stderr.contains(PERSIST_CONN_ERROR) => {
                Self::DatabaseUnavailable(stderr.to_string())
            }
            _ => Self::Command(err),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown status command '{0}', expected 'sacct' or 'squeue'")]
pub struct UnknownStatusCommand(String);

/// The command used to look up job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCommand {
    /// Accounting history
    Sacct,
    /// Live queue
    Squeue,
}

impl StatusCommand {
    pub fn program(&self) -> &'static str {
        match self {
            Self::Sacct => "sacct",
            Self::Squeue => "squeue",
        }
    }

    /// Arguments for querying all jobs of `run_id`.
    pub fn args(&self, run_id: &str, now: DateTime<Local>) -> Vec<String> {
        match self {
            Self::Sacct => sacct_args(run_id, now),
            Self::Squeue => squeue_args(run_id),
        }
    }
}

impl fmt::Display for StatusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for StatusCommand {
    type Err = UnknownStatusCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sacct" => Ok(Self::Sacct),
            "squeue" => Ok(Self::Squeue),
            other => Err(UnknownStatusCommand(other.to_string())),
        }
    }
}

/// sacct arguments. The start time uses hour precision so that older SLURM
/// releases accept it.
pub fn sacct_args(run_id: &str, now: DateTime<Local>) -> Vec<String> {
    let start = (now - ChronoDuration::days(2))
        .format("%Y-%m-%dT%H:00")
        .to_string();
    [
        "-X",
        "--parsable2",
        "--clusters",
        "all",
        "--noheader",
        "--format=JobIdRaw,State",
        "--starttime",
        start.as_str(),
        "--endtime",
        "now",
        "--name",
        run_id,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn squeue_args(run_id: &str) -> Vec<String> {
    [
        "--format=%i|%T",
        "--states=all",
        "--noheader",
        "--name",
        run_id,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Parse `<job id>|<state>` lines. Only the first word of the state is kept.
pub fn parse_status_output(output: &str) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = match berth_parsers::split_delimited(line, 2) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!("Skipping status line: {}", e);
                continue;
            }
        };
        let job_id = fields[0].trim();
        let Some(state) = fields[1].split_whitespace().next() else {
            continue;
        };
        if !job_id.is_empty() {
            snapshot.insert(job_id.to_string(), state.to_string());
        }
    }
    snapshot
}

/// Run one status query.
pub async fn query_status(
    command: StatusCommand,
    run_id: &str,
    timeout: Duration,
) -> Result<StatusSnapshot, StatusQueryError> {
    let args = command.args(run_id, Local::now());
    tracing::debug!("querying job status: {} {}", command, args.join(" "));

    let mut cmd = Command::new(command.program());
    cmd.args(&args);
    let started = std::time::Instant::now();
    let stdout = run_command_with_timeout(&mut cmd, command.program(), timeout).await?;
    tracing::debug!(
        "{} returned {} bytes in {:.3}s",
        command,
        stdout.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(parse_status_output(&stdout))
}

/// Something that can produce a status snapshot for the tracked jobs.
pub trait StatusSource {
    fn query(&self) -> impl Future<Output = Result<StatusSnapshot, StatusQueryError>> + Send;
}

/// Status source backed by sacct or squeue.
#[derive(Debug, Clone)]
pub struct SlurmStatus {
    run_id: String,
    command: StatusCommand,
    timeout: Duration,
}

impl SlurmStatus {
    pub fn new(run_id: impl Into<String>, command: StatusCommand, timeout: Duration) -> Self {
        Self {
            run_id: run_id.into(),
            command,
            timeout,
        }
    }

    pub fn command(&self) -> StatusCommand {
        self.command
    }
}

impl StatusSource for SlurmStatus {
    async fn query(&self) -> Result<StatusSnapshot, StatusQueryError> {
        let result = query_status(self.command, &self.run_id, self.timeout).await;
        match &result {
            Err(StatusQueryError::DatabaseUnavailable(stderr)) => tracing::warn!(
                "The SLURM database might not be available, this is a server-side issue: {}",
                stderr
            ),
            Err(e) => tracing::error!("Job status query with {} failed: {}", self.command, e),
            Ok(_) => {}
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sacct_args() {
        let now = Local.with_ymd_and_hms(2024, 6, 12, 14, 37, 5).unwrap();
        let args = sacct_args("run-abc", now);
        assert_eq!(
            args.join(" "),
            "-X --parsable2 --clusters all --noheader --format=JobIdRaw,State \
             --starttime 2024-06-10T14:00 --endtime now --name run-abc"
        );
    }

    #[test]
    fn test_squeue_args() {
        assert_eq!(
            squeue_args("run-abc").join(" "),
            "--format=%i|%T --states=all --noheader --name run-abc"
        );
    }

    #[test]
    fn test_status_command_from_str() {
        assert_eq!("sacct".parse::<StatusCommand>(), Ok(StatusCommand::Sacct));
        assert_eq!("SQUEUE".parse::<StatusCommand>(), Ok(StatusCommand::Squeue));
        assert!("qstat".parse::<StatusCommand>().is_err());
        assert_eq!(StatusCommand::Sacct.to_string(), "sacct");
    }

    #[test]
    fn test_parse_status_output() {
        let output = "101|COMPLETED\n102|CANCELLED by 1000\n103|RUNNING\n\n";
        let snapshot = parse_status_output(output);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot["101"], "COMPLETED");
        assert_eq!(snapshot["102"], "CANCELLED");
        assert_eq!(snapshot["103"], "RUNNING");
    }

    #[test]
    fn test_parse_status_output_skips_malformed() {
        let output = "garbage\n104|\n105|PENDING\n";
        let snapshot = parse_status_output(output);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["105"], "PENDING");
    }

    #[test]
    fn test_persist_conn_error_classified() {
        let err = CommandError::Failed {
            command: "sacct".to_string(),
            code: Some(1),
            stderr: "sacct: error: slurm_persist_conn_open_without_init: failed".to_string(),
        };
        assert!(matches!(
            StatusQueryError::from(err),
            StatusQueryError::DatabaseUnavailable(_)
        ));

        let err = CommandError::Failed {
            command: "sacct".to_string(),
            code: Some(1),
            stderr: "sacct: invalid option".to_string(),
        };
        assert!(matches!(
            StatusQueryError::from(err),
            StatusQueryError::Command(_)
        ));
    }
}
