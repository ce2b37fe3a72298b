//! Best-fit partition selection.
//!
//! A partition is eligible for a job when no requested resource exceeds the
//! matching limit. Among eligible partitions, the one with the highest score
//! wins, where the score is the sum of `requested / limit` over every
//! requested resource with a finite limit. Tighter fits score higher, which
//! keeps small jobs off large partitions.

use crate::limits::Partition;
use crate::resources::{CpuRequirement, GpuRequirement, ResourceError, ResourceRequest};
use serde::Serialize;
use std::fmt;

/// Why a partition cannot take a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Ineligibility {
    ClusterMismatch {
        requested: Option<String>,
        partition: Option<String>,
    },
    ExceedsLimit {
        resource: &'static str,
        requested: f64,
        limit: f64,
    },
    GpuModelUnavailable(String),
    MpiUnsupported,
    ConstraintUnavailable(String),
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClusterMismatch {
                requested,
                partition,
            } => write!(
                f,
                "job cluster {} does not match partition cluster {}",
                requested.as_deref().unwrap_or("(none)"),
                partition.as_deref().unwrap_or("(none)")
            ),
            Self::ExceedsLimit {
                resource,
                requested,
                limit,
            } => write!(f, "{resource} {requested} exceeds limit {limit}"),
            Self::GpuModelUnavailable(model) => write!(f, "GPU model {model} not available"),
            Self::MpiUnsupported => write!(f, "MPI not supported"),
            Self::ConstraintUnavailable(c) => write!(f, "constraint {c} not available"),
        }
    }
}

/// The chosen partition and its fit score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub partition: String,
    pub score: f64,
}

/// Running sum of `requested / limit` ratios.
#[derive(Debug, Default)]
struct FitScore(f64);

impl FitScore {
    /// Account for one resource. Absent or non-positive requests and infinite
    /// limits are skipped.
    fn add(
        &mut self,
        resource: &'static str,
        requested: Option<f64>,
        limit: f64,
    ) -> Result<(), Ineligibility> {
        let Some(requested) = requested.filter(|r| *r > 0.0) else {
            return Ok(());
        };
        if limit.is_infinite() {
            return Ok(());
        }
        if requested > limit {
            return Err(Ineligibility::ExceedsLimit {
                resource,
                requested,
                limit,
            });
        }
        self.0 += requested / limit;
        Ok(())
    }
}

impl Partition {
    /// Fit score of a job on this partition, or the first reason it is
    /// ineligible.
    pub fn score_job_fit(
        &self,
        request: &ResourceRequest,
        gpu: &GpuRequirement,
        cpu: CpuRequirement,
    ) -> Result<f64, Ineligibility> {
        let limits = &self.limits;

        if request.cluster != limits.cluster {
            return Err(Ineligibility::ClusterMismatch {
                requested: request.cluster.clone(),
                partition: limits.cluster.clone(),
            });
        }

        let mut score = FitScore::default();
        let as_f64 = |v: Option<u32>| v.map(f64::from);

        score.add("mem_mb", request.mem_mb.map(|v| v as f64), limits.max_mem_mb)?;
        score.add(
            "mem_mb_per_cpu",
            request.mem_mb_per_cpu.map(|v| v as f64),
            limits.max_mem_mb_per_cpu,
        )?;
        score.add(
            "runtime",
            request.runtime_minutes.map(|v| v as f64),
            limits.max_runtime,
        )?;
        score.add("nodes", as_f64(request.nodes), limits.max_nodes)?;
        score.add("tasks", as_f64(request.tasks), limits.max_tasks)?;
        score.add(
            "tasks_per_node",
            as_f64(request.tasks_per_node),
            limits.max_tasks_per_node,
        )?;

        match cpu {
            CpuRequirement::PerTask(cpus) => {
                let cpus = Some(f64::from(cpus));
                score.add("cpus_per_task", cpus, limits.max_cpus_per_task)?;
                score.add("threads", cpus, limits.max_threads)?;
            }
            CpuRequirement::PerGpu(cpus) => {
                score.add("cpus_per_gpu", Some(f64::from(cpus)), limits.max_cpus_per_gpu)?;
            }
            CpuRequirement::Threads(threads) => {
                score.add("threads", Some(f64::from(threads)), limits.max_threads)?;
            }
        }

        if gpu.count > 0 {
            score.add("gpu", Some(f64::from(gpu.count)), limits.max_gpu)?;
            if let Some(model) = &gpu.model
                && let Some(models) = &limits.available_gpu_models
                && !models.contains(model)
            {
                return Err(Ineligibility::GpuModelUnavailable(model.clone()));
            }
        }

        if request.mpi {
            if !limits.supports_mpi {
                return Err(Ineligibility::MpiUnsupported);
            }
            score.add("mpi_tasks", as_f64(request.tasks), limits.max_mpi_tasks)?;
        }

        if let Some(available) = &limits.available_constraints
            && let Some(missing) = request.constraints.iter().find(|c| !available.contains(*c))
        {
            return Err(Ineligibility::ConstraintUnavailable(missing.clone()));
        }

        Ok(score.0)
    }
}

/// Pick the best-fitting partition for a job.
///
/// Returns `Ok(None)` when no partition is eligible. Ties go to the partition
/// listed first. Conflicting GPU specifications are rejected before any
/// partition is considered.
pub fn select_partition(
    request: &ResourceRequest,
    partitions: &[Partition],
) -> Result<Option<Selection>, ResourceError> {
    let gpu = request.gpu_requirement()?;
    let cpu = request.cpu_requirement();

    let mut best: Option<Selection> = None;
    for partition in partitions {
        match partition.score_job_fit(request, &gpu, cpu) {
            Ok(score) => {
                tracing::debug!("partition {} scores {:.4}", partition.name, score);
                if best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(Selection {
                        partition: partition.name.clone(),
                        score,
                    });
                }
            }
            Err(reason) => {
                tracing::debug!("partition {} ineligible: {}", partition.name, reason);
            }
        }
    }

    match &best {
        Some(selection) => tracing::info!(
            "selected partition {} (score {:.4})",
            selection.partition,
            selection.score
        ),
        None => tracing::warn!(
            "no suitable partition found among {} configured partitions",
            partitions.len()
        ),
    }
    Ok(best)
}
