//! Partition limit types.

use crate::catalog::CatalogError;
use berth_parsers::{minutes_from_number, parse_time_minutes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Upper bounds a partition places on a single job.
///
/// Numeric limits are `f64` so that "no limit" is `f64::INFINITY`; an
/// infinite limit never excludes a job and never adds to its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionLimits {
    /// Minutes
    pub max_runtime: f64,
    pub max_mem_mb: f64,
    pub max_mem_mb_per_cpu: f64,
    pub max_cpus_per_task: f64,
    pub max_threads: f64,
    pub max_nodes: f64,
    pub max_tasks: f64,
    pub max_tasks_per_node: f64,
    /// Zero means the partition has no GPUs
    pub max_gpu: f64,
    /// `None` accepts any model
    pub available_gpu_models: Option<BTreeSet<String>>,
    pub max_cpus_per_gpu: f64,
    pub supports_mpi: bool,
    pub max_mpi_tasks: f64,
    /// `None` accepts any constraint
    pub available_constraints: Option<BTreeSet<String>>,
    pub cluster: Option<String>,
}

impl Default for PartitionLimits {
    fn default() -> Self {
        Self {
            max_runtime: f64::INFINITY,
            max_mem_mb: f64::INFINITY,
            max_mem_mb_per_cpu: f64::INFINITY,
            max_cpus_per_task: f64::INFINITY,
            max_threads: f64::INFINITY,
            max_nodes: f64::INFINITY,
            max_tasks: f64::INFINITY,
            max_tasks_per_node: f64::INFINITY,
            max_gpu: 0.0,
            available_gpu_models: None,
            max_cpus_per_gpu: f64::INFINITY,
            supports_mpi: true,
            max_mpi_tasks: f64::INFINITY,
            available_constraints: None,
            cluster: None,
        }
    }
}

/// A named partition and its limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub name: String,
    pub limits: PartitionLimits,
}

impl Partition {
    pub fn new(name: impl Into<String>, limits: PartitionLimits) -> Self {
        Self {
            name: name.into(),
            limits,
        }
    }
}

/// Runtime limit as written in a configuration file: minutes or a time string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeLimit {
    Minutes(f64),
    Text(String),
}

/// On-disk form of a partition's limits. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_runtime: Option<RuntimeLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mem_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mem_mb_per_cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cpus_per_task: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tasks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tasks_per_node: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_gpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_gpu_models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cpus_per_gpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_mpi: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mpi_tasks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_constraints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

impl LimitsRecord {
    /// Validate and fill defaults for absent fields.
    pub fn into_limits(self, partition: &str) -> Result<PartitionLimits, CatalogError> {
        let invalid = |field: &'static str, reason: String| CatalogError::InvalidLimit {
            partition: partition.to_string(),
            field,
            reason,
        };
        let bound = |field: &'static str, value: Option<f64>, default: f64| match value {
            None => Ok(default),
            Some(v) if v.is_nan() || v < 0.0 => {
                Err(invalid(field, format!("expected a non-negative number, got {v}")))
            }
            Some(v) => Ok(v),
        };

        let max_runtime = match self.max_runtime {
            None => f64::INFINITY,
            Some(RuntimeLimit::Minutes(v)) => {
                let v = bound("max_runtime", Some(v), f64::INFINITY)?;
                // whole minutes; `.inf` stays unbounded
                minutes_from_number(v).map_or(v, |m| m as f64)
            }
            Some(RuntimeLimit::Text(s)) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("UNLIMITED") || s.eq_ignore_ascii_case("INFINITE") {
                    f64::INFINITY
                } else {
                    parse_time_minutes(s)
                        .map(|m| m as f64)
                        .map_err(|e| invalid("max_runtime", e.to_string()))?
                }
            }
        };

        let names = |values: Option<Vec<String>>| {
            values.map(|v| {
                v.into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<BTreeSet<_>>()
            })
        };

        let defaults = PartitionLimits::default();
        Ok(PartitionLimits {
            max_runtime,
            max_mem_mb: bound("max_mem_mb", self.max_mem_mb, defaults.max_mem_mb)?,
            max_mem_mb_per_cpu: bound(
                "max_mem_mb_per_cpu",
                self.max_mem_mb_per_cpu,
                defaults.max_mem_mb_per_cpu,
            )?,
            max_cpus_per_task: bound(
                "max_cpus_per_task",
                self.max_cpus_per_task,
                defaults.max_cpus_per_task,
            )?,
            max_threads: bound("max_threads", self.max_threads, defaults.max_threads)?,
            max_nodes: bound("max_nodes", self.max_nodes, defaults.max_nodes)?,
            max_tasks: bound("max_tasks", self.max_tasks, defaults.max_tasks)?,
            max_tasks_per_node: bound(
                "max_tasks_per_node",
                self.max_tasks_per_node,
                defaults.max_tasks_per_node,
            )?,
            max_gpu: bound("max_gpu", self.max_gpu, defaults.max_gpu)?,
            available_gpu_models: names(self.available_gpu_models),
            max_cpus_per_gpu: bound(
                "max_cpus_per_gpu",
                self.max_cpus_per_gpu,
                defaults.max_cpus_per_gpu,
            )?,
            supports_mpi: self.supports_mpi.unwrap_or(defaults.supports_mpi),
            max_mpi_tasks: bound("max_mpi_tasks", self.max_mpi_tasks, defaults.max_mpi_tasks)?,
            available_constraints: names(self.available_constraints),
            cluster: self
                .cluster
                .and_then(|c| berth_parsers::non_empty_string(&c)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = PartitionLimits::default();
        assert!(limits.max_runtime.is_infinite());
        assert!(limits.max_threads.is_infinite());
        assert_eq!(limits.max_gpu, 0.0);
        assert!(limits.supports_mpi);
        assert!(limits.available_gpu_models.is_none());
        assert!(limits.cluster.is_none());
    }

    #[test]
    fn test_empty_record_is_default() {
        let limits = LimitsRecord::default().into_limits("p").unwrap();
        assert_eq!(limits, PartitionLimits::default());
    }

    #[test]
    fn test_runtime_forms() {
        let record = LimitsRecord {
            max_runtime: Some(RuntimeLimit::Text("6-00:00:00".to_string())),
            ..Default::default()
        };
        assert_eq!(record.into_limits("p").unwrap().max_runtime, 8640.0);

        let record = LimitsRecord {
            max_runtime: Some(RuntimeLimit::Minutes(120.0)),
            ..Default::default()
        };
        assert_eq!(record.into_limits("p").unwrap().max_runtime, 120.0);

        for (minutes, expected) in [(120.5, 121.0), (120.4, 120.0)] {
            let record = LimitsRecord {
                max_runtime: Some(RuntimeLimit::Minutes(minutes)),
                ..Default::default()
            };
            assert_eq!(record.into_limits("p").unwrap().max_runtime, expected);
        }

        let record = LimitsRecord {
            max_runtime: Some(RuntimeLimit::Minutes(f64::INFINITY)),
            ..Default::default()
        };
        assert!(record.into_limits("p").unwrap().max_runtime.is_infinite());

        let record = LimitsRecord {
            max_runtime: Some(RuntimeLimit::Text("UNLIMITED".to_string())),
            ..Default::default()
        };
        assert!(record.into_limits("p").unwrap().max_runtime.is_infinite());

        let record = LimitsRecord {
            max_runtime: Some(RuntimeLimit::Text("forever".to_string())),
            ..Default::default()
        };
        assert!(matches!(
            record.into_limits("p"),
            Err(CatalogError::InvalidLimit {
                field: "max_runtime",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_limit_rejected() {
        let record = LimitsRecord {
            max_mem_mb: Some(-1.0),
            ..Default::default()
        };
        let err = record.into_limits("gpu").unwrap_err();
        assert!(err.to_string().contains("max_mem_mb"));
        assert!(err.to_string().contains("gpu"));
    }
}
