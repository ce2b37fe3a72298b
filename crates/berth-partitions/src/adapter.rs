//! Build a [`ResourceRequest`] from a workflow engine's resource mapping.
//!
//! Workflow engines hand over resources as a loose JSON object. Values may be
//! numbers, numeric strings or booleans; absent, null and non-positive values
//! mean "not requested".

use crate::resources::{ResourceError, ResourceRequest};
use berth_parsers::{minutes_from_number, parse_memory_mb, parse_time_minutes};
use serde_json::Value;
use std::collections::BTreeSet;

/// Loose resource mapping as produced by a workflow engine.
pub type ResourceMap = serde_json::Map<String, Value>;

/// Numeric value of a resource, accepting numbers and numeric strings.
fn number(resources: &ResourceMap, key: &str) -> Option<f64> {
    match resources.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Positive count, rounded up. Zero and negative values count as absent.
fn count<T: TryFrom<u64>>(resources: &ResourceMap, key: &str) -> Option<T> {
    number(resources, key)
        .filter(|v| *v > 0.0)
        .and_then(|v| T::try_from(v.ceil() as u64).ok())
}

/// Memory in MB; strings may carry a unit suffix ("16G").
fn memory(resources: &ResourceMap, key: &str) -> Option<u64> {
    match resources.get(key)? {
        Value::String(s) => parse_memory_mb(s).filter(|mb| *mb > 0),
        _ => count(resources, key),
    }
}

fn text(resources: &ResourceMap, key: &str) -> Option<String> {
    match resources.get(key)? {
        Value::String(s) => berth_parsers::non_empty_string(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(resources: &ResourceMap, key: &str) -> bool {
    match resources.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        _ => false,
    }
}

fn runtime(resources: &ResourceMap) -> Result<Option<u64>, ResourceError> {
    match resources.get("runtime") {
        Some(Value::Number(n)) => Ok(n.as_f64().and_then(minutes_from_number)),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(parse_time_minutes(s)?)),
        _ => Ok(None),
    }
}

fn constraints(resources: &ResourceMap) -> BTreeSet<String> {
    let split = |s: &str| {
        s.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect::<Vec<_>>()
    };
    match resources.get("constraint") {
        Some(Value::String(s)) => split(s).into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(split)
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// `slurm_account` may list several accounts, separated by commas or blanks.
fn accounts(resources: &ResourceMap) -> Vec<String> {
    text(resources, "slurm_account")
        .map(|s| {
            s.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

impl ResourceRequest {
    /// Normalize a resource mapping.
    ///
    /// Recognized keys: `mem_mb`, `mem_mb_per_cpu`, `cpus_per_task`,
    /// `cpus_per_gpu`, `threads` (or `_cores`), `gpu`, `gpu_model`, `gres`,
    /// `runtime`, `nodes`, `tasks`, `tasks_per_node`, `mpi`, `constraint`,
    /// `slurm_partition`, `slurm_account` and `slurm_cluster` (or
    /// `cluster`/`clusters`).
    /// Unknown keys are ignored.
    pub fn from_resources(resources: &ResourceMap) -> Result<Self, ResourceError> {
        // negative means unset, zero means one
        let cpus_per_task = number(resources, "cpus_per_task")
            .filter(|v| *v >= 0.0)
            .map(|v| (v.ceil() as u32).max(1));

        let request = Self {
            mem_mb: memory(resources, "mem_mb"),
            mem_mb_per_cpu: memory(resources, "mem_mb_per_cpu"),
            cpus_per_task,
            cpus_per_gpu: count(resources, "cpus_per_gpu"),
            threads: count(resources, "threads")
                .or_else(|| count(resources, "_cores"))
                .unwrap_or(1),
            gpu: count(resources, "gpu").unwrap_or(0),
            gpu_model: text(resources, "gpu_model"),
            gres: text(resources, "gres"),
            runtime_minutes: runtime(resources)?,
            nodes: count(resources, "nodes"),
            tasks: count(resources, "tasks"),
            tasks_per_node: count(resources, "tasks_per_node"),
            mpi: flag(resources, "mpi"),
            constraints: constraints(resources),
            cluster: ["slurm_cluster", "cluster", "clusters"]
                .into_iter()
                .find_map(|key| text(resources, key)),
            partition: text(resources, "slurm_partition"),
            accounts: accounts(resources),
        };

        request.validate()?;
        Ok(request)
    }
}
