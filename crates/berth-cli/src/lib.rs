//! CLI argument parsing for berth.

use berth_slurm::{ConfigError, StatusCommand};
use berth_state::ReconcileConfig;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "berth")]
#[command(about = "Pick SLURM partitions for jobs and track them to completion")]
#[command(version)]
pub struct Args {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Job status command (sacct or squeue); detected when omitted
    #[arg(long, global = true)]
    pub status_command: Option<StatusCommand>,

    /// Status queries per reconciliation cycle
    #[arg(long, default_value = "5", global = true)]
    pub status_attempts: u32,

    /// Seconds to wait before the first status check
    #[arg(long, default_value = "40", global = true)]
    pub init_seconds_before_status_checks: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pick the best-fitting partition for a job
    Select(SelectArgs),
    /// Generate a partition configuration from scontrol
    Partitions(PartitionsArgs),
    /// Track submitted jobs until they finish
    Watch(WatchArgs),
    /// Cancel jobs
    Cancel(CancelArgs),
}

#[derive(clap::Args, Debug)]
pub struct SelectArgs {
    /// Partition configuration (YAML), defaults to $BERTH_PARTITIONS
    #[arg(long)]
    pub partition_config: Option<Utf8PathBuf>,

    /// Job resources as a JSON object, read from a file or "-" for stdin
    #[arg(long)]
    pub resources: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub flags: ResourceFlags,

    /// Do not guess or validate a SLURM account
    #[arg(long, conflicts_with = "account")]
    pub no_account: bool,

    /// Print the selection as JSON
    #[arg(long)]
    pub json: bool,
}

/// Job resources given on the command line.
#[derive(clap::Args, Debug, Default)]
pub struct ResourceFlags {
    #[arg(long)]
    pub mem_mb: Option<u64>,
    #[arg(long)]
    pub mem_mb_per_cpu: Option<u64>,
    #[arg(long)]
    pub cpus_per_task: Option<u32>,
    #[arg(long)]
    pub cpus_per_gpu: Option<u32>,
    #[arg(long)]
    pub threads: Option<u32>,
    #[arg(long)]
    pub gpu: Option<u32>,
    #[arg(long)]
    pub gpu_model: Option<String>,
    /// Generic resources, e.g. "gpu:a100:2"
    #[arg(long)]
    pub gres: Option<String>,
    /// Minutes or a SLURM time string ("2h", "1-00:00:00")
    #[arg(long)]
    pub runtime: Option<String>,
    #[arg(long)]
    pub nodes: Option<u32>,
    #[arg(long)]
    pub tasks: Option<u32>,
    #[arg(long)]
    pub tasks_per_node: Option<u32>,
    #[arg(long)]
    pub mpi: bool,
    /// Node features, comma separated
    #[arg(long, value_delimiter = ',')]
    pub constraint: Vec<String>,
    #[arg(long)]
    pub cluster: Option<String>,
    #[arg(long)]
    pub slurm_partition: Option<String>,
    /// SLURM account(s), comma separated
    #[arg(long)]
    pub account: Option<String>,
}

impl ResourceFlags {
    /// The flags as a resource mapping, using the same keys as a workflow
    /// engine would.
    pub fn to_resource_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        put("mem_mb", self.mem_mb.map(Value::from));
        put("mem_mb_per_cpu", self.mem_mb_per_cpu.map(Value::from));
        put("cpus_per_task", self.cpus_per_task.map(Value::from));
        put("cpus_per_gpu", self.cpus_per_gpu.map(Value::from));
        put("threads", self.threads.map(Value::from));
        put("gpu", self.gpu.map(Value::from));
        put("gpu_model", self.gpu_model.clone().map(Value::from));
        put("gres", self.gres.clone().map(Value::from));
        put("runtime", self.runtime.clone().map(Value::from));
        put("nodes", self.nodes.map(Value::from));
        put("tasks", self.tasks.map(Value::from));
        put("tasks_per_node", self.tasks_per_node.map(Value::from));
        put("mpi", self.mpi.then_some(Value::Bool(true)));
        put(
            "constraint",
            (!self.constraint.is_empty()).then(|| Value::from(self.constraint.join(","))),
        );
        put("slurm_cluster", self.cluster.clone().map(Value::from));
        put("slurm_partition", self.slurm_partition.clone().map(Value::from));
        put("slurm_account", self.account.clone().map(Value::from));
        map
    }
}

#[derive(clap::Args, Debug)]
pub struct PartitionsArgs {
    /// Clusters to query (comma separated); the local cluster when omitted
    #[arg(value_delimiter = ',')]
    pub clusters: Vec<String>,

    /// Write the configuration to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Workflow run id the jobs were submitted under (their job name)
    #[arg(long)]
    pub run_id: String,

    /// SLURM job ids to track
    #[arg(required = true)]
    pub job_ids: Vec<String>,

    /// Directory holding `<job id>.log` files
    #[arg(long)]
    pub log_dir: Option<Utf8PathBuf>,

    /// Keep log files of successful jobs
    #[arg(long)]
    pub keep_successful_logs: bool,

    /// Consecutive UNKNOWN reports before a job counts as completed
    #[arg(long, default_value = "1")]
    pub unknown_confirmations: u32,

    /// Pass --clusters=all when cancelling on interrupt
    #[arg(long)]
    pub clusters: bool,

    /// Seconds to wait for scancel when cancelling on interrupt
    #[arg(long, default_value = "60")]
    pub cancel_timeout: u64,
}

#[derive(clap::Args, Debug)]
pub struct CancelArgs {
    /// SLURM job ids to cancel
    #[arg(required = true)]
    pub job_ids: Vec<String>,

    /// Cancel across all clusters
    #[arg(long)]
    pub clusters: bool,

    /// Seconds to wait for scancel
    #[arg(long, default_value = "60")]
    pub timeout: u64,
}

impl Args {
    /// Reject settings that cannot work before anything runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.status_attempts < 1 {
            return Err(ConfigError::InvalidStatusAttempts(self.status_attempts));
        }
        if let Command::Select(select) = &self.command
            && let Some(path) = &select.partition_config
            && !path.exists()
        {
            return Err(ConfigError::PartitionConfigMissing(path.to_string()));
        }
        Ok(())
    }

    /// Reconciliation settings for `watch`.
    pub fn reconcile_config(&self, watch: &WatchArgs) -> ReconcileConfig {
        ReconcileConfig {
            initial_interval: Duration::from_secs(self.init_seconds_before_status_checks),
            status_attempts: self.status_attempts,
            unknown_confirmations: watch.unknown_confirmations,
            keep_successful_logs: watch.keep_successful_logs,
            ..Default::default()
        }
    }
}
