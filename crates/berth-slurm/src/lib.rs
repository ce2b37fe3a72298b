//! SLURM integration for berth.
//!
//! Query job states via sacct or squeue, detect which of them the cluster
//! supports, look up the user's accounts, and cancel jobs via scancel.

pub mod account;
pub mod cancel;
pub mod capabilities;
pub mod scontrol;
pub mod sinfo;
pub mod status;
pub mod types;

pub use account::{SlurmAccounts, current_user, parse_account_list, parse_last_account};
pub use cancel::{CancelError, DEFAULT_CANCEL_TIMEOUT, cancel_jobs};
pub use capabilities::{Capabilities, ConfigError};
pub use sinfo::SinfoDefaultPartition;
pub use status::{
    DEFAULT_QUERY_TIMEOUT, SlurmStatus, StatusCommand, StatusQueryError, StatusSource,
    UnknownStatusCommand,
};
pub use types::{FAILED_STATES, SlurmJobState, StatusSnapshot};
