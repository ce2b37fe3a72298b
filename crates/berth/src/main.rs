//! Berth - partition selection and job tracking for SLURM.

mod partitions;
mod select;
mod watch;

use berth_cli::{Args, Command};
use berth_slurm::cancel_jobs;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    args.validate().into_diagnostic()?;

    match &args.command {
        Command::Select(select) => select::run(select).await,
        Command::Partitions(partitions) => partitions::run(partitions).await,
        Command::Watch(watch) => {
            let summary = watch::run(&args, watch).await?;
            if summary.interrupted {
                miette::bail!("interrupted, {} jobs cancelled", summary.cancelled);
            }
            if summary.failed > 0 {
                miette::bail!("{} of {} jobs failed", summary.failed, watch.job_ids.len());
            }
            Ok(())
        }
        Command::Cancel(cancel) => cancel_jobs(
            &cancel.job_ids,
            cancel.clusters,
            Duration::from_secs(cancel.timeout),
        )
        .await
        .into_diagnostic(),
    }
}

/// Log to stderr; `RUST_LOG` overrides the `-v` count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}
