//! Normalized resource requests.

use berth_parsers::TimeParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Per-job input errors. These reject one job, never the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error(
        "GPU resource specified in both 'gpu' ({gpu}) and 'gres' ('{gres}'). \
         These are mutually exclusive."
    )]
    GpuConflict { gpu: u32, gres: String },
    #[error(
        "Invalid GRES format: '{0}'. Expected '<name>:<number>' or \
         '<name>:<type>:<number>' (e.g. 'gpu:1' or 'gpu:tesla:2')"
    )]
    InvalidGres(String),
    #[error("GPU model '{0}' is set, but no GPU number is given")]
    GpuModelWithoutCount(String),
    #[error("Invalid runtime: {0}")]
    InvalidRuntime(#[from] TimeParseError),
}

/// Resolved GPU demand of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuRequirement {
    pub count: u32,
    pub model: Option<String>,
}

/// How a job's CPU demand is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuRequirement {
    /// Explicit `cpus_per_task`
    PerTask(u32),
    /// `cpus_per_gpu` of a GPU job
    PerGpu(u32),
    /// Effective thread count
    Threads(u32),
}

/// What a single job asks of the cluster.
///
/// Absent values are `None`; nothing here is looked up lazily. Build one with
/// [`ResourceRequest::from_resources`] or fill the fields directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRequest {
    pub mem_mb: Option<u64>,
    pub mem_mb_per_cpu: Option<u64>,
    pub cpus_per_task: Option<u32>,
    pub cpus_per_gpu: Option<u32>,
    pub threads: u32,
    pub gpu: u32,
    pub gpu_model: Option<String>,
    /// Raw generic resource string, e.g. "gpu:a100:2"
    pub gres: Option<String>,
    pub runtime_minutes: Option<u64>,
    pub nodes: Option<u32>,
    pub tasks: Option<u32>,
    pub tasks_per_node: Option<u32>,
    pub mpi: bool,
    pub constraints: BTreeSet<String>,
    /// Cluster the job must run on
    pub cluster: Option<String>,
    /// Partition named explicitly by the job
    pub partition: Option<String>,
    /// Accounts named explicitly by the job
    pub accounts: Vec<String>,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        Self {
            mem_mb: None,
            mem_mb_per_cpu: None,
            cpus_per_task: None,
            cpus_per_gpu: None,
            threads: 1,
            gpu: 0,
            gpu_model: None,
            gres: None,
            runtime_minutes: None,
            nodes: None,
            tasks: None,
            tasks_per_node: None,
            mpi: false,
            constraints: BTreeSet::new(),
            cluster: None,
            partition: None,
            accounts: Vec::new(),
        }
    }
}

impl ResourceRequest {
    /// Thread count, never below one.
    pub fn effective_threads(&self) -> u32 {
        self.threads.max(1)
    }

    /// The first `gpu` entry of the generic resource string, if any.
    fn gres_gpu_entry(&self) -> Option<&str> {
        self.gres
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|entry| entry.starts_with("gpu"))
    }

    /// Whether the job asks for GPUs in any form.
    pub fn requests_gpu(&self) -> bool {
        self.gpu > 0 || self.gres_gpu_entry().is_some()
    }

    /// Resolve GPU count and model from `gpu`/`gpu_model` or `gres`.
    pub fn gpu_requirement(&self) -> Result<GpuRequirement, ResourceError> {
        let gres_entry = self.gres_gpu_entry();

        if self.gpu > 0 {
            if let Some(gres) = &self.gres
                && gres_entry.is_some()
            {
                return Err(ResourceError::GpuConflict {
                    gpu: self.gpu,
                    gres: gres.clone(),
                });
            }
            return Ok(GpuRequirement {
                count: self.gpu,
                model: self.gpu_model.clone(),
            });
        }

        if let Some(entry) = gres_entry {
            let invalid = || ResourceError::InvalidGres(entry.to_string());
            let fields: Vec<&str> = entry.split(':').collect();
            let (model, count) = match fields.as_slice() {
                ["gpu", count] => (None, *count),
                ["gpu", model, count] if !model.is_empty() => (Some(model.to_string()), *count),
                _ => return Err(invalid()),
            };
            let count = count.parse::<u32>().map_err(|_| invalid())?;
            return Ok(GpuRequirement {
                count,
                model: model.or_else(|| self.gpu_model.clone()),
            });
        }

        if let Some(model) = &self.gpu_model {
            return Err(ResourceError::GpuModelWithoutCount(model.clone()));
        }

        Ok(GpuRequirement::default())
    }

    /// CPU demand: explicit per-task CPUs, else per-GPU CPUs for GPU jobs,
    /// else the thread count.
    pub fn cpu_requirement(&self) -> CpuRequirement {
        if let Some(cpus) = self.cpus_per_task {
            // zero CPUs per task is not a valid request
            return CpuRequirement::PerTask(cpus.max(1));
        }
        if self.requests_gpu()
            && let Some(cpus) = self.cpus_per_gpu.filter(|c| *c > 0)
        {
            return CpuRequirement::PerGpu(cpus);
        }
        CpuRequirement::Threads(self.effective_threads())
    }

    /// Reject conflicting specifications up front.
    pub fn validate(&self) -> Result<(), ResourceError> {
        self.gpu_requirement().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        let request = ResourceRequest::default();
        assert_eq!(request.threads, 1);
        assert_eq!(request.gpu, 0);
        assert!(!request.requests_gpu());
        assert_eq!(request.cpu_requirement(), CpuRequirement::Threads(1));
        assert_eq!(request.gpu_requirement(), Ok(GpuRequirement::default()));
    }

    #[test]
    fn test_gpu_from_count() {
        let request = ResourceRequest {
            gpu: 2,
            gpu_model: Some("a100".to_string()),
            ..Default::default()
        };
        let gpu = request.gpu_requirement().unwrap();
        assert_eq!(gpu.count, 2);
        assert_eq!(gpu.model.as_deref(), Some("a100"));
    }

    #[test]
    fn test_gpu_from_gres() {
        let request = ResourceRequest {
            gres: Some("gpu:2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            request.gpu_requirement(),
            Ok(GpuRequirement { count: 2, model: None })
        );

        let request = ResourceRequest {
            gres: Some("tmpdisk:100,gpu:v100:4".to_string()),
            ..Default::default()
        };
        assert_eq!(
            request.gpu_requirement(),
            Ok(GpuRequirement {
                count: 4,
                model: Some("v100".to_string())
            })
        );
    }

    #[test]
    fn test_gres_without_gpu() {
        let request = ResourceRequest {
            gres: Some("tmpdisk:100".to_string()),
            ..Default::default()
        };
        assert!(!request.requests_gpu());
        assert_eq!(request.gpu_requirement(), Ok(GpuRequirement::default()));
    }

    #[test]
    fn test_gpu_conflict() {
        let request = ResourceRequest {
            gpu: 1,
            gres: Some("gpu:1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.gpu_requirement(),
            Err(ResourceError::GpuConflict { gpu: 1, .. })
        ));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_invalid_gres() {
        for gres in ["gpu", "gpu:a100:x", "gpu::2", "gpu:a:b:c"] {
            let request = ResourceRequest {
                gres: Some(gres.to_string()),
                ..Default::default()
            };
            assert!(
                matches!(request.gpu_requirement(), Err(ResourceError::InvalidGres(_))),
                "expected invalid gres for {gres}"
            );
        }
    }

    #[test]
    fn test_gpu_model_without_count() {
        let request = ResourceRequest {
            gpu_model: Some("a100".to_string()),
            ..Default::default()
        };
        assert_eq!(
            request.gpu_requirement(),
            Err(ResourceError::GpuModelWithoutCount("a100".to_string()))
        );
    }

    #[test]
    fn test_cpu_requirement_modes() {
        let request = ResourceRequest {
            cpus_per_task: Some(8),
            threads: 4,
            ..Default::default()
        };
        assert_eq!(request.cpu_requirement(), CpuRequirement::PerTask(8));

        let request = ResourceRequest {
            cpus_per_task: Some(0),
            ..Default::default()
        };
        assert_eq!(request.cpu_requirement(), CpuRequirement::PerTask(1));

        let request = ResourceRequest {
            gpu: 1,
            cpus_per_gpu: Some(6),
            threads: 2,
            ..Default::default()
        };
        assert_eq!(request.cpu_requirement(), CpuRequirement::PerGpu(6));

        // cpus_per_gpu only counts for GPU jobs
        let request = ResourceRequest {
            cpus_per_gpu: Some(6),
            threads: 2,
            ..Default::default()
        };
        assert_eq!(request.cpu_requirement(), CpuRequirement::Threads(2));

        let request = ResourceRequest {
            threads: 0,
            ..Default::default()
        };
        assert_eq!(request.cpu_requirement(), CpuRequirement::Threads(1));
    }
}
