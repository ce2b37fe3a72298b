//! `berth select`: print the partition a job should go to.

use berth_cli::SelectArgs;
use berth_partitions::{
    PartitionCatalog, PartitionResolver, ResourceMap, ResourceRequest, partition_config_path,
    select_partition,
};
use berth_slurm::{SinfoDefaultPartition, SlurmAccounts};
use camino::Utf8Path;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

#[derive(Serialize)]
struct SelectOutput<'a> {
    partition: Option<&'a str>,
    /// Fit score, when the partition was picked from the catalog
    score: Option<f64>,
    /// Accounts the job is charged to; empty to submit without one
    accounts: &'a [String],
    request: &'a ResourceRequest,
}

pub async fn run(args: &SelectArgs) -> Result<()> {
    let catalog = match partition_config_path(args.partition_config.as_deref()) {
        Some(path) => {
            let catalog = PartitionCatalog::load(&path).into_diagnostic()?;
            tracing::info!("loaded {} partitions from {}", catalog.len(), path);
            Some(catalog)
        }
        None => None,
    };

    let mut resources = match &args.resources {
        Some(path) => read_resources(path)?,
        None => ResourceMap::new(),
    };
    resources.extend(args.flags.to_resource_map());
    let request = ResourceRequest::from_resources(&resources).into_diagnostic()?;

    let mut resolver = PartitionResolver::new(catalog, SinfoDefaultPartition);
    let partition = resolver.resolve(&request).await.into_diagnostic()?;

    let score = match (resolver.catalog(), &partition) {
        (Some(catalog), Some(chosen)) => select_partition(&request, catalog.partitions())
            .into_diagnostic()?
            .filter(|s| &s.partition == chosen)
            .map(|s| s.score),
        _ => None,
    };

    let accounts = if args.no_account {
        Vec::new()
    } else {
        match SlurmAccounts::for_current_user() {
            Some(source) => resolver
                .with_accounts(source)
                .resolve_accounts(&request)
                .await
                .into_diagnostic()?,
            None => {
                tracing::warn!("Unable to determine the current user, accounts are not checked");
                request.accounts.clone()
            }
        }
    };
    if !accounts.is_empty() {
        tracing::info!("account: {}", accounts.join(","));
    }

    if args.json {
        let output = SelectOutput {
            partition: partition.as_deref(),
            score,
            accounts: &accounts,
            request: &request,
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        return Ok(());
    }
    match (partition, score) {
        (Some(partition), Some(score)) => println!("{partition}\t{score:.4}"),
        (Some(partition), None) => println!("{partition}"),
        (None, _) => tracing::warn!("no partition selected, submit without one"),
    }
    Ok(())
}

/// A JSON object of resources from a file, or stdin for `-`.
fn read_resources(path: &Utf8Path) -> Result<ResourceMap> {
    let content = if path.as_str() == "-" {
        std::io::read_to_string(std::io::stdin()).into_diagnostic()?
    } else {
        std::fs::read_to_string(path).into_diagnostic()?
    };
    serde_json::from_str(&content).into_diagnostic()
}
