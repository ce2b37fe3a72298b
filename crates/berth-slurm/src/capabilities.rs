//! Detect which status commands a cluster supports.

use crate::status::StatusCommand;
use berth_parsers::{run_command_with_timeout, tool_available};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// `MinJobAge = 300 sec`, `MinJobAge = 1h`, `MinJobAge = 3600`
static MIN_JOB_AGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*MinJobAge\s*=\s*(\d+)\s*([A-Za-z]*)").expect("valid MinJobAge regex")
});

const SCONTROL_CONFIG_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Neither 'sacct' nor 'squeue' is available. At least one of them is required \
         for job status queries."
    )]
    NoStatusCommand,
    #[error("status_attempts must be at least 1, got {0}")]
    InvalidStatusAttempts(u32),
    #[error("Partition configuration file not found: {0}")]
    PartitionConfigMissing(String),
}

/// What the local SLURM installation offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub sacct: bool,
    pub squeue: bool,
    /// `MinJobAge` from the controller configuration
    pub min_job_age: Option<Duration>,
}

impl Capabilities {
    /// Check `PATH` and the controller configuration.
    pub async fn detect() -> Self {
        let (sacct, squeue, min_job_age) = tokio::join!(
            tool_available("sacct"),
            tool_available("squeue"),
            query_min_job_age()
        );
        Self {
            sacct,
            squeue,
            min_job_age,
        }
    }

    /// Preferred status command: sacct when present, else squeue.
    pub fn default_status_command(&self) -> Result<StatusCommand, ConfigError> {
        if self.sacct {
            Ok(StatusCommand::Sacct)
        } else if self.squeue {
            Ok(StatusCommand::Squeue)
        } else {
            Err(ConfigError::NoStatusCommand)
        }
    }

    /// The command actually used, given the configured one.
    ///
    /// squeue forgets finished jobs after `MinJobAge`, so it is only kept when
    /// that age spans at least three initial polling intervals.
    pub fn effective_status_command(
        &self,
        configured: StatusCommand,
        initial_interval: Duration,
    ) -> StatusCommand {
        let threshold = initial_interval * 3;
        let mut command = configured;

        if command == StatusCommand::Squeue
            && self.min_job_age.is_none_or(|age| age < threshold)
            && self.sacct
        {
            tracing::info!(
                "Falling back to 'sacct' for status queries (MinJobAge={:?}; threshold={}s)",
                self.min_job_age.map(|a| a.as_secs()),
                threshold.as_secs()
            );
            command = StatusCommand::Sacct;
        }
        if command == StatusCommand::Sacct && !self.sacct {
            tracing::info!("'sacct' unavailable, using 'squeue' for status queries");
            command = StatusCommand::Squeue;
        }
        command
    }
}

/// Extract `MinJobAge` from `scontrol show config` output.
pub fn parse_min_job_age(config: &str) -> Option<Duration> {
    config.lines().find_map(|line| {
        let caps = MIN_JOB_AGE.captures(line)?;
        let value: u64 = caps[1].parse().ok()?;
        let seconds = match caps[2].to_lowercase().as_str() {
            "h" | "hour" | "hours" => value * 3600,
            // seconds, no unit, or anything unrecognized
            _ => value,
        };
        Some(Duration::from_secs(seconds))
    })
}

async fn query_min_job_age() -> Option<Duration> {
    let mut cmd = Command::new("scontrol");
    cmd.args(["show", "config"]);
    match run_command_with_timeout(&mut cmd, "scontrol", SCONTROL_CONFIG_TIMEOUT).await {
        Ok(output) => parse_min_job_age(&output),
        Err(e) => {
            tracing::debug!("could not read MinJobAge: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL: Duration = Duration::from_secs(40);

    #[test]
    fn test_parse_min_job_age() {
        let config = "AccountingStorageType = accounting_storage/slurmdbd\n\
                      MinJobAge               = 300 sec\n\
                      MpiDefault = none\n";
        assert_eq!(parse_min_job_age(config), Some(Duration::from_secs(300)));
        assert_eq!(
            parse_min_job_age("MinJobAge = 1h"),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(
            parse_min_job_age("MinJobAge = 3600"),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(
            parse_min_job_age("MinJobAge = 2 hours"),
            Some(Duration::from_secs(7200))
        );
        assert_eq!(parse_min_job_age("MaxJobCount = 10000"), None);
        assert_eq!(parse_min_job_age("MinJobAge = n/a"), None);
    }

    #[test]
    fn test_default_status_command() {
        let caps = Capabilities {
            sacct: true,
            squeue: true,
            ..Default::default()
        };
        assert_eq!(caps.default_status_command(), Ok(StatusCommand::Sacct));

        let caps = Capabilities {
            squeue: true,
            ..Default::default()
        };
        assert_eq!(caps.default_status_command(), Ok(StatusCommand::Squeue));

        assert_eq!(
            Capabilities::default().default_status_command(),
            Err(ConfigError::NoStatusCommand)
        );
    }

    #[test]
    fn test_squeue_falls_back_to_sacct() {
        let caps = Capabilities {
            sacct: true,
            squeue: true,
            min_job_age: Some(Duration::from_secs(60)),
        };
        assert_eq!(
            caps.effective_status_command(StatusCommand::Squeue, INITIAL),
            StatusCommand::Sacct
        );

        let caps = Capabilities {
            min_job_age: None,
            ..caps
        };
        assert_eq!(
            caps.effective_status_command(StatusCommand::Squeue, INITIAL),
            StatusCommand::Sacct
        );
    }

    #[test]
    fn test_squeue_kept_with_long_min_job_age() {
        let caps = Capabilities {
            sacct: true,
            squeue: true,
            min_job_age: Some(Duration::from_secs(120)),
        };
        assert_eq!(
            caps.effective_status_command(StatusCommand::Squeue, INITIAL),
            StatusCommand::Squeue
        );
    }

    #[test]
    fn test_squeue_kept_without_sacct() {
        let caps = Capabilities {
            sacct: false,
            squeue: true,
            min_job_age: None,
        };
        assert_eq!(
            caps.effective_status_command(StatusCommand::Squeue, INITIAL),
            StatusCommand::Squeue
        );
    }

    #[test]
    fn test_sacct_falls_back_to_squeue() {
        let caps = Capabilities {
            sacct: false,
            squeue: true,
            min_job_age: None,
        };
        assert_eq!(
            caps.effective_status_command(StatusCommand::Sacct, INITIAL),
            StatusCommand::Squeue
        );
    }
}
