//! `berth watch`: poll SLURM until every tracked job has finished.

use berth_cli::{Args, WatchArgs};
use berth_slurm::{Capabilities, SlurmStatus, cancel_jobs};
use berth_state::{JobReporter, Reconciler, SubmittedJob, TickOutcome};
use miette::{IntoDiagnostic, Result};
use std::time::Duration;

/// How a watch ended.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub cancelled: usize,
}

/// Logs every verdict and counts them.
#[derive(Debug, Default)]
struct LogReporter {
    succeeded: usize,
    failed: usize,
}

impl JobReporter for LogReporter {
    fn report_success(&mut self, job: &SubmittedJob) {
        self.succeeded += 1;
        tracing::info!("job {} ({}) completed", job.external_id, job.logical_id);
    }

    fn report_failure(&mut self, job: &SubmittedJob, message: &str) {
        self.failed += 1;
        tracing::error!("{} ({})", message, job.logical_id);
    }
}

pub async fn run(args: &Args, watch: &WatchArgs) -> Result<WatchSummary> {
    let config = args.reconcile_config(watch);
    config.validate().into_diagnostic()?;

    let capabilities = Capabilities::detect().await;
    let configured = match args.status_command {
        Some(command) => command,
        None => capabilities.default_status_command().into_diagnostic()?,
    };
    let command = capabilities.effective_status_command(configured, config.initial_interval);
    tracing::info!("querying job status with {}", command);
    let source = SlurmStatus::new(&watch.run_id, command, config.query_timeout);

    let mut reconciler = Reconciler::new(config);
    for id in &watch.job_ids {
        let mut job = SubmittedJob::new(id, id);
        if let Some(dir) = &watch.log_dir {
            job = job.with_log_path(dir.join(format!("{id}.log")));
        }
        reconciler.track(job);
    }

    let mut reporter = LogReporter::default();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    while !reconciler.is_idle() {
        let wait = reconciler.next_interval();
        tracing::debug!("next status check in {}s", wait.as_secs());

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(wait) => false,
            _ = &mut interrupt => true,
        };
        if interrupted {
            return Ok(interrupt_summary(&reconciler, &reporter, watch).await);
        }

        let outcome = tokio::select! {
            outcome = reconciler.tick(&source, &mut reporter) => Some(outcome),
            _ = &mut interrupt => None,
        };
        match outcome {
            Some(outcome) => print_finished(&outcome)?,
            None => return Ok(interrupt_summary(&reconciler, &reporter, watch).await),
        }
    }

    Ok(WatchSummary {
        succeeded: reporter.succeeded,
        failed: reporter.failed,
        ..Default::default()
    })
}

/// One JSON line per finished job on stdout.
fn print_finished(outcome: &TickOutcome) -> Result<()> {
    for finished in &outcome.finished {
        println!("{}", serde_json::to_string(finished).into_diagnostic()?);
    }
    Ok(())
}

/// Cancel what is still running, through the reconciler's limiter.
async fn interrupt_summary(
    reconciler: &Reconciler,
    reporter: &LogReporter,
    watch: &WatchArgs,
) -> WatchSummary {
    let ids = reconciler.active_ids();
    tracing::warn!("interrupted, cancelling {} active jobs", ids.len());
    let result = reconciler
        .limiter()
        .run(cancel_jobs(
            &ids,
            watch.clusters,
            Duration::from_secs(watch.cancel_timeout),
        ))
        .await;
    if let Err(e) = result {
        tracing::error!("{}", e);
    }
    WatchSummary {
        succeeded: reporter.succeeded,
        failed: reporter.failed,
        interrupted: true,
        cancelled: ids.len(),
    }
}
