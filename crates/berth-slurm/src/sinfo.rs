//! Cluster default partition via sinfo.

use berth_parsers::run_command_with_timeout;
use berth_partitions::DefaultPartitionSource;
use std::time::Duration;
use tokio::process::Command;

const SINFO_TIMEOUT: Duration = Duration::from_secs(30);

/// The partition sinfo marks with a trailing `*`.
pub fn parse_default_partition(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_suffix('*'))
        .filter(|name| !name.is_empty())
        .map(String::from)
}

/// Ask sinfo for the default partition.
pub async fn query_default_partition() -> Option<String> {
    let mut cmd = Command::new("sinfo");
    cmd.args(["-h", "-o", "%P"]);
    match run_command_with_timeout(&mut cmd, "sinfo", SINFO_TIMEOUT).await {
        Ok(output) => parse_default_partition(&output),
        Err(e) => {
            tracing::warn!("Failed to query the default partition: {}", e);
            None
        }
    }
}

/// [`DefaultPartitionSource`] backed by sinfo.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinfoDefaultPartition;

impl DefaultPartitionSource for SinfoDefaultPartition {
    async fn default_partition(&self) -> Option<String> {
        query_default_partition().await
    }
}
