//! Derive catalog entries from `scontrol show partition` output.
//!
//! Each partition record is a run of whitespace-separated `Key=Value` pairs
//! starting at `PartitionName=`. The derived limits are a starting point for
//! a hand-maintained catalog, not a substitute for one.

use crate::limits::{LimitsRecord, RuntimeLimit};
use std::collections::{BTreeMap, HashSet};

/// Raw attributes of one partition.
pub type PartitionAttributes = BTreeMap<String, String>;

/// Split `scontrol show partition` output into per-partition attributes,
/// preserving partition order.
pub fn parse_scontrol_partitions(output: &str) -> Vec<(String, PartitionAttributes)> {
    let mut partitions: Vec<(String, PartitionAttributes)> = Vec::new();

    for token in output.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        if key == "PartitionName" {
            partitions.push((value.to_string(), PartitionAttributes::new()));
            continue;
        }
        if let Some((_, attributes)) = partitions.last_mut() {
            attributes.insert(key.to_string(), value.to_string());
        }
    }

    partitions
}

fn is_unlimited(value: &str) -> bool {
    value.eq_ignore_ascii_case("UNLIMITED") || value.eq_ignore_ascii_case("INFINITE")
}

/// Positive numeric attribute; "UNLIMITED" and zero count as absent.
fn positive(attributes: &PartitionAttributes, key: &str) -> Option<f64> {
    attributes
        .get(key)
        .filter(|v| !is_unlimited(v))
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| *v > 0.0)
}

/// GPU count from a TRES string such as "cpu=71808,mem=1M,gres/gpu=40".
fn tres_gpus(tres: &str) -> Option<f64> {
    tres.split(',')
        .filter_map(|entry| entry.split_once('='))
        .find(|(name, _)| *name == "gres/gpu")
        .and_then(|(_, count)| count.parse::<f64>().ok())
}

/// Map scontrol attributes to catalog limits.
pub fn extract_partition_limits(attributes: &PartitionAttributes) -> LimitsRecord {
    let mut record = LimitsRecord::default();

    if let Some(max_time) = attributes.get("MaxTime")
        && !is_unlimited(max_time)
    {
        record.max_runtime = Some(RuntimeLimit::Text(max_time.clone()));
    }

    record.max_nodes = positive(attributes, "MaxNodes");
    record.max_mem_mb_per_cpu =
        positive(attributes, "MaxMemPerCPU").or_else(|| positive(attributes, "DefMemPerCPU"));
    record.max_mem_mb = positive(attributes, "MaxMemPerNode");
    record.max_cpus_per_task = positive(attributes, "MaxCPUsPerNode");

    if let (Some(cpus), Some(nodes)) = (
        positive(attributes, "TotalCPUs"),
        positive(attributes, "TotalNodes"),
    ) {
        record.max_threads = Some((cpus / nodes).floor());
    }

    if let Some(gpus) = attributes.get("TRES").and_then(|t| tres_gpus(t)) {
        record.max_gpu = Some(gpus);
    }

    record
}

/// Build catalog entries from per-cluster scontrol output.
///
/// Partitions from a named cluster are keyed `<cluster>_<partition>` and
/// pinned to that cluster.
pub fn generate_partition_entries(
    outputs: &[(Option<&str>, &str)],
) -> Vec<(String, LimitsRecord)> {
    let mut entries = Vec::new();
    for (cluster, output) in outputs {
        for (name, attributes) in parse_scontrol_partitions(output) {
            let mut record = extract_partition_limits(&attributes);
            let key = match cluster {
                Some(cluster) => {
                    record.cluster = Some(cluster.to_string());
                    format!("{cluster}_{name}")
                }
                None => name,
            };
            entries.push((key, record));
        }
    }
    entries
}

/// Drop `<cluster>_` key prefixes where that leaves names unique.
pub fn strip_cluster_prefixes(entries: Vec<(String, LimitsRecord)>) -> Vec<(String, LimitsRecord)> {
    let short_name = |key: &str, record: &LimitsRecord| -> Option<String> {
        let cluster = record.cluster.as_deref()?;
        key.strip_prefix(cluster)?
            .strip_prefix('_')
            .filter(|rest| !rest.is_empty())
            .map(String::from)
    };

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (key, record) in &entries {
        let name = short_name(key, record).unwrap_or_else(|| key.clone());
        *counts.entry(name).or_default() += 1;
    }

    let mut taken: HashSet<String> = HashSet::new();
    entries
        .into_iter()
        .map(|(key, record)| {
            let key = match short_name(&key, &record) {
                Some(name) if counts.get(&name) == Some(&1) && taken.insert(name.clone()) => name,
                _ => key,
            };
            (key, record)
        })
        .collect()
}

/// Render entries as a catalog YAML document.
pub fn render_partition_config(
    entries: &[(String, LimitsRecord)],
) -> Result<String, serde_yaml::Error> {
    let mut partitions = serde_yaml::Mapping::new();
    for (name, record) in entries {
        partitions.insert(
            serde_yaml::Value::String(name.clone()),
            serde_yaml::to_value(record)?,
        );
    }
    let mut document = serde_yaml::Mapping::new();
    document.insert(
        serde_yaml::Value::String("partitions".to_string()),
        serde_yaml::Value::Mapping(partitions),
    );
    serde_yaml::to_string(&document)
}
