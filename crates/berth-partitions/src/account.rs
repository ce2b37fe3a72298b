//! SLURM accounts a job is charged to.
//!
//! Accounts named by the job are checked against the accounts the user is
//! registered with. Without one, the user's most recent account is guessed
//! once per session.

use std::collections::BTreeSet;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("The given account {account} appears to be invalid. Available accounts: {available}")]
    Invalid { account: String, available: String },
    #[error(
        "Unable to test the validity of the given or guessed SLURM account(s). \
         sacctmgr: {sacctmgr}; sshare: {sshare}"
    )]
    Unverifiable { sacctmgr: String, sshare: String },
}

/// Guesses the account for jobs that name none.
pub trait DefaultAccountSource {
    fn default_account(&self) -> impl Future<Output = Option<String>> + Send;
}

/// Lists the accounts the current user may submit under.
pub trait AccountRegistry {
    /// An empty set means the cluster did not tell; accounts then pass
    /// unchecked.
    fn registered_accounts(
        &self,
    ) -> impl Future<Output = Result<BTreeSet<String>, AccountError>> + Send;
}

/// Check `account` against the registered set, ignoring case.
pub fn validate_account(account: &str, registered: &BTreeSet<String>) -> Result<(), AccountError> {
    if registered.is_empty() {
        tracing::warn!(
            "Unable to list the SLURM accounts of this user. Proceeding without account \
             validation."
        );
        return Ok(());
    }
    if registered.iter().any(|r| r.eq_ignore_ascii_case(account)) {
        return Ok(());
    }
    Err(AccountError::Invalid {
        account: account.to_string(),
        available: registered.iter().cloned().collect::<Vec<_>>().join(", "),
    })
}
