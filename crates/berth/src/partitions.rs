//! `berth partitions`: derive a partition configuration from scontrol.

use berth_cli::PartitionsArgs;
use berth_partitions::render_partition_config;
use berth_slurm::scontrol::discover_partitions;
use miette::{IntoDiagnostic, Result};

pub async fn run(args: &PartitionsArgs) -> Result<()> {
    let entries = discover_partitions(&args.clusters).await.into_diagnostic()?;
    if entries.is_empty() {
        tracing::warn!("scontrol reported no partitions");
    }
    let yaml = render_partition_config(&entries).into_diagnostic()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, yaml).into_diagnostic()?;
            tracing::info!("wrote {} partitions to {}", entries.len(), path);
        }
        None => print!("{yaml}"),
    }

    tracing::warn!(
        "Generated limits are the configured scheduler maxima. Review them before use, \
         site policies or QOS settings may be stricter."
    );
    Ok(())
}
