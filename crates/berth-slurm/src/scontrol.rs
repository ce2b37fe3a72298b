//! Partition discovery via scontrol.

use berth_parsers::{CommandError, run_command_with_timeout};
use berth_partitions::{LimitsRecord, generate_partition_entries, strip_cluster_prefixes};
use std::time::Duration;
use tokio::process::Command;

const SCONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw `scontrol show partition` output, optionally for one cluster.
pub async fn show_partitions(cluster: Option<&str>) -> Result<String, CommandError> {
    let mut cmd = Command::new("scontrol");
    if let Some(cluster) = cluster {
        cmd.arg(format!("--clusters={cluster}"));
    }
    cmd.args(["show", "partition"]);
    run_command_with_timeout(&mut cmd, "scontrol", SCONTROL_TIMEOUT).await
}

/// Query every cluster (or the local one) and derive catalog entries.
pub async fn discover_partitions(
    clusters: &[String],
) -> Result<Vec<(String, LimitsRecord)>, CommandError> {
    if clusters.is_empty() {
        let output = show_partitions(None).await?;
        return Ok(generate_partition_entries(&[(None, output.as_str())]));
    }

    let mut outputs = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        tracing::debug!("querying partitions of cluster {}", cluster);
        outputs.push((cluster.as_str(), show_partitions(Some(cluster)).await?));
    }
    let borrowed: Vec<(Option<&str>, &str)> = outputs
        .iter()
        .map(|(cluster, output)| (Some(*cluster), output.as_str()))
        .collect();
    Ok(strip_cluster_prefixes(generate_partition_entries(&borrowed)))
}
