//! The user's SLURM accounts via sacct, sacctmgr and sshare.

use berth_parsers::run_command_with_timeout;
use berth_partitions::{AccountError, AccountRegistry, DefaultAccountSource};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::process::Command;

const ACCOUNT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// The account of the user's most recent job, as printed by
/// `sacct -nu <user> -o Account%256`.
pub fn parse_last_account(output: &str) -> Option<String> {
    let last = output.lines().rev().find(|line| !line.trim().is_empty())?;
    let account = last.replace("(null)", "");
    let account = account.trim();
    if account.is_empty() || account.eq_ignore_ascii_case("none") {
        return None;
    }
    Some(account.to_string())
}

/// One account per line, blank lines dropped.
pub fn parse_account_list(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Login name of the current user.
pub fn current_user() -> Option<String> {
    ["USER", "LOGNAME"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok())
        .filter(|user| !user.is_empty())
}

/// Account lookups for one user.
#[derive(Debug, Clone)]
pub struct SlurmAccounts {
    user: String,
}

impl SlurmAccounts {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }

    /// Lookups for the user running berth.
    pub fn for_current_user() -> Option<Self> {
        current_user().map(Self::new)
    }
}

impl DefaultAccountSource for SlurmAccounts {
    async fn default_account(&self) -> Option<String> {
        let mut cmd = Command::new("sacct");
        cmd.args(["-nu", &self.user, "-o", "Account%256"]);
        match run_command_with_timeout(&mut cmd, "sacct", ACCOUNT_QUERY_TIMEOUT).await {
            Ok(output) => parse_last_account(&output),
            Err(e) => {
                tracing::warn!("Unable to get a SLURM account via sacct: {}", e);
                None
            }
        }
    }
}

impl AccountRegistry for SlurmAccounts {
    /// sacctmgr first; sshare when sacctmgr fails or lists nothing.
    async fn registered_accounts(&self) -> Result<BTreeSet<String>, AccountError> {
        let mut cmd = Command::new("sacctmgr");
        cmd.args(["-n", "-s", "list", "user", &self.user, "format=account%256"]);
        let sacctmgr_report =
            match run_command_with_timeout(&mut cmd, "sacctmgr", ACCOUNT_QUERY_TIMEOUT).await {
                Ok(output) => {
                    let accounts = parse_account_list(&output);
                    if !accounts.is_empty() {
                        return Ok(accounts);
                    }
                    "no accounts listed".to_string()
                }
                Err(e) => e.to_string(),
            };
        tracing::debug!("sacctmgr: {}, falling back to sshare", sacctmgr_report);

        let mut cmd = Command::new("sshare");
        cmd.args(["-U", "--format", "Account%256", "--noheader"]);
        match run_command_with_timeout(&mut cmd, "sshare", ACCOUNT_QUERY_TIMEOUT).await {
            Ok(output) => Ok(parse_account_list(&output)),
            Err(e) => Err(AccountError::Unverifiable {
                sacctmgr: sacctmgr_report,
                sshare: e.to_string(),
            }),
        }
    }
}
