//! Partition catalog loading.
//!
//! The catalog is a YAML document with a single top-level `partitions`
//! mapping. Each key is a partition name and each value holds that
//! partition's limits; a missing or null body means "no limits":
//!
//! ```yaml
//! partitions:
//!   short:
//!     max_runtime: 60
//!     max_mem_mb: 64000
//!   gpu:
//!     max_gpu: 4
//!     available_gpu_models: [a100]
//!   scratch:
//! ```
//!
//! Partition order is kept; it decides ties during selection.

use crate::limits::{LimitsRecord, Partition, PartitionLimits};
use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml::Value;
use thiserror::Error;

/// Environment variable naming the partition configuration file.
pub const PARTITIONS_ENV: &str = "BERTH_PARTITIONS";

/// Error type for catalog loading.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Partition configuration file not found: {0}")]
    NotFound(Utf8PathBuf),
    #[error("Failed to read partition configuration {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML in partition configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Partition configuration must contain a top-level 'partitions' key")]
    MissingPartitions,
    #[error("'partitions' must be a mapping of partition names to limits")]
    PartitionsNotAMapping,
    #[error("Partition names must be non-empty strings, got {0:?}")]
    InvalidName(String),
    #[error("Partition '{partition}': {reason}")]
    InvalidPartition { partition: String, reason: String },
    #[error("Partition '{partition}': invalid value for '{field}': {reason}")]
    InvalidLimit {
        partition: String,
        field: &'static str,
        reason: String,
    },
}

/// Ordered collection of partitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionCatalog {
    partitions: Vec<Partition>,
}

impl PartitionCatalog {
    pub fn new(partitions: Vec<Partition>) -> Self {
        Self { partitions }
    }

    /// Read and validate a catalog file.
    pub fn load(path: &Utf8Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_owned()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_owned(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        tracing::debug!("loaded {} partitions from {}", catalog.len(), path);
        Ok(catalog)
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let document: Value = serde_yaml::from_str(content)?;
        let Some(section) = document.get("partitions") else {
            return Err(CatalogError::MissingPartitions);
        };
        let Value::Mapping(entries) = section else {
            return Err(CatalogError::PartitionsNotAMapping);
        };

        let mut partitions = Vec::with_capacity(entries.len());
        for (key, body) in entries {
            let name = partition_name(key)?;
            let limits = match body {
                Value::Null => PartitionLimits::default(),
                Value::Mapping(_) => serde_yaml::from_value::<LimitsRecord>(body.clone())
                    .map_err(|e| CatalogError::InvalidPartition {
                        partition: name.clone(),
                        reason: e.to_string(),
                    })?
                    .into_limits(&name)?,
                other => {
                    return Err(CatalogError::InvalidPartition {
                        partition: name,
                        reason: format!("limits must be a mapping, got {other:?}"),
                    });
                }
            };
            partitions.push(Partition::new(name, limits));
        }

        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

fn partition_name(key: &Value) -> Result<String, CatalogError> {
    let name = match key {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(CatalogError::InvalidName(format!("{other:?}"))),
    };
    if name.is_empty() {
        return Err(CatalogError::InvalidName(name));
    }
    Ok(name)
}

/// Catalog path from an explicit flag, else from [`PARTITIONS_ENV`].
pub fn partition_config_path(flag: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
    flag.map(Utf8Path::to_owned).or_else(|| {
        std::env::var(PARTITIONS_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Utf8PathBuf::from)
    })
}
