//! Partition resolution for a job.
//!
//! An explicit partition on the job always wins. Otherwise the catalog (if
//! any) picks the best fit, and failing that the cluster's default partition
//! is used, looked up once per session. Accounts follow the same pattern: the
//! job's own accounts are checked, otherwise a guessed account is memoized.

use crate::account::{AccountError, AccountRegistry, DefaultAccountSource, validate_account};
use crate::catalog::PartitionCatalog;
use crate::resources::{ResourceError, ResourceRequest};
use crate::scorer::select_partition;
use std::collections::BTreeSet;
use std::future::Future;

/// Source of the cluster's default partition.
pub trait DefaultPartitionSource {
    fn default_partition(&self) -> impl Future<Output = Option<String>> + Send;
}

/// Per-session memo of cluster-wide lookups.
#[derive(Debug, Default)]
pub struct SessionContext {
    default_partition: Option<Option<String>>,
    default_account: Option<Option<String>>,
    registered_accounts: Option<BTreeSet<String>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized default partition; `None` if it has not been looked up.
    pub fn cached_default_partition(&self) -> Option<Option<&str>> {
        self.default_partition.as_ref().map(Option::as_deref)
    }

    pub fn remember_default_partition(&mut self, partition: Option<String>) {
        self.default_partition = Some(partition);
    }

    /// The memoized fallback account; `None` if it has not been guessed.
    pub fn cached_default_account(&self) -> Option<Option<&str>> {
        self.default_account.as_ref().map(Option::as_deref)
    }

    pub fn remember_default_account(&mut self, account: Option<String>) {
        self.default_account = Some(account);
    }
}

/// Resolves the partition, and optionally the accounts, of each job.
pub struct PartitionResolver<S, A = ()> {
    catalog: Option<PartitionCatalog>,
    source: S,
    accounts: A,
    context: SessionContext,
}

impl<S: DefaultPartitionSource> PartitionResolver<S> {
    pub fn new(catalog: Option<PartitionCatalog>, source: S) -> Self {
        Self {
            catalog,
            source,
            accounts: (),
            context: SessionContext::new(),
        }
    }
}

impl<S, A> PartitionResolver<S, A> {
    /// Resolve accounts too, looking them up through `accounts`.
    pub fn with_accounts<B>(self, accounts: B) -> PartitionResolver<S, B> {
        PartitionResolver {
            catalog: self.catalog,
            source: self.source,
            accounts,
            context: self.context,
        }
    }
}

impl<S: DefaultPartitionSource, A> PartitionResolver<S, A> {
    pub fn catalog(&self) -> Option<&PartitionCatalog> {
        self.catalog.as_ref()
    }

    /// Partition for `request`, or `None` to let the scheduler decide.
    pub async fn resolve(
        &mut self,
        request: &ResourceRequest,
    ) -> Result<Option<String>, ResourceError> {
        if let Some(partition) = &request.partition {
            if !self.pinned_elsewhere(partition, request.cluster.as_deref()) {
                return Ok(Some(partition.clone()));
            }
            tracing::info!(
                "partition {} belongs to another cluster than {}, selecting automatically",
                partition,
                request.cluster.as_deref().unwrap_or_default()
            );
        }

        if let Some(catalog) = &self.catalog
            && let Some(selection) = select_partition(request, catalog.partitions())?
        {
            return Ok(Some(selection.partition));
        }

        Ok(self.default_partition().await)
    }

    /// Whether the catalog pins `partition` to a cluster other than `cluster`.
    fn pinned_elsewhere(&self, partition: &str, cluster: Option<&str>) -> bool {
        let Some(cluster) = cluster else {
            return false;
        };
        self.catalog
            .as_ref()
            .and_then(|c| c.get(partition))
            .and_then(|p| p.limits.cluster.as_deref())
            .is_some_and(|pinned| pinned != cluster)
    }

    async fn default_partition(&mut self) -> Option<String> {
        if let Some(cached) = self.context.cached_default_partition() {
            return cached.map(String::from);
        }
        let partition = self.source.default_partition().await;
        match &partition {
            Some(p) => tracing::debug!("cluster default partition: {}", p),
            None => tracing::warn!("could not determine the cluster default partition"),
        }
        self.context.remember_default_partition(partition.clone());
        partition
    }
}

impl<S, A: DefaultAccountSource + AccountRegistry> PartitionResolver<S, A> {
    /// Accounts to charge `request` to. Empty means submit without one.
    pub async fn resolve_accounts(
        &mut self,
        request: &ResourceRequest,
    ) -> Result<Vec<String>, AccountError> {
        if !request.accounts.is_empty() {
            let registered = self.registered_accounts().await?;
            for account in &request.accounts {
                validate_account(account, &registered)?;
            }
            return Ok(request.accounts.clone());
        }

        if let Some(cached) = self.context.cached_default_account() {
            return Ok(cached.map(String::from).into_iter().collect());
        }
        tracing::warn!("No SLURM account given, trying to guess.");
        let guessed = self.accounts.default_account().await;
        match &guessed {
            Some(account) => {
                tracing::warn!("Guessed SLURM account: {}", account);
                let registered = self.registered_accounts().await?;
                validate_account(account, &registered)?;
            }
            None => tracing::warn!("Unable to guess SLURM account. Trying to proceed without."),
        }
        self.context.remember_default_account(guessed.clone());
        Ok(guessed.into_iter().collect())
    }

    async fn registered_accounts(&mut self) -> Result<BTreeSet<String>, AccountError> {
        if let Some(cached) = &self.context.registered_accounts {
            return Ok(cached.clone());
        }
        let registered = self.accounts.registered_accounts().await?;
        tracing::debug!("registered accounts: {:?}", registered);
        self.context.registered_accounts = Some(registered.clone());
        Ok(registered)
    }
}
