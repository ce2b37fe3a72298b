//! Partition catalogs and best-fit partition selection.
//!
//! A job's resources are normalized into a [`ResourceRequest`], checked
//! against each [`Partition`] in a [`PartitionCatalog`], and the tightest
//! fitting partition is chosen by [`select_partition`].

pub mod account;
pub mod adapter;
pub mod catalog;
pub mod limits;
pub mod resolve;
pub mod resources;
pub mod scontrol;
pub mod scorer;

pub use account::{AccountError, AccountRegistry, DefaultAccountSource, validate_account};
pub use adapter::ResourceMap;
pub use catalog::{CatalogError, PARTITIONS_ENV, PartitionCatalog, partition_config_path};
pub use limits::{LimitsRecord, Partition, PartitionLimits, RuntimeLimit};
pub use resolve::{DefaultPartitionSource, PartitionResolver, SessionContext};
pub use resources::{CpuRequirement, GpuRequirement, ResourceError, ResourceRequest};
pub use scontrol::{
    extract_partition_limits, generate_partition_entries, parse_scontrol_partitions,
    render_partition_config, strip_cluster_prefixes,
};
pub use scorer::{Ineligibility, Selection, select_partition};
