// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Command line surface: `apply` and `delete` subcommands.

use crate::config::Config;
use crate::kubernetes::{create_client, wait_for_established, KubeCrdClient};
use crate::manifests::ManifestLoader;
use crate::reconcilers::{CrdReconciler, FailurePolicy, Operation};
use crate::wait::WaitContext;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Tools for managing Custom Resource Definitions (CRDs)
#[derive(Parser, Debug)]
#[command(name = "crdctl", version, about, long_about = None)]
pub struct Cli {
    /// Enable debug-level logging (also set by DEBUG=true)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to a kubeconfig file; inferred from the environment when omitted
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply CRDs from the specified path
    Apply(ApplyArgs),
    /// Delete CRDs from the specified path
    Delete(CrdArgs),
}

/// Flags shared by both subcommands
#[derive(Args, Debug, Clone)]
pub struct CrdArgs {
    /// Path to CRD manifest file or directory (can be specified multiple
    /// times, directories are searched recursively)
    #[arg(long = "crds-path", required = true)]
    pub crds_paths: Vec<PathBuf>,

    /// Stop at the first CRD that fails instead of attempting all of them
    #[arg(long)]
    pub stop_on_error: bool,

    /// Fail on documents that are not CustomResourceDefinitions
    #[arg(long)]
    pub strict: bool,

    /// Number of CRDs reconciled at the same time
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub crds: CrdArgs,

    /// Wait until every applied CRD is established
    #[arg(long)]
    pub wait_established: bool,

    /// Upper bound in seconds for --wait-established
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl CrdArgs {
    fn policy(&self) -> FailurePolicy {
        if self.stop_on_error {
            FailurePolicy::StopOnFirstError
        } else {
            FailurePolicy::ContinueOnError
        }
    }
}

impl Cli {
    /// Run the selected subcommand; `ctx` is cancelled on interrupt
    pub async fn run(self, config: Config, ctx: WaitContext) -> Result<()> {
        match self.command {
            Commands::Apply(args) => run_apply(args, self.kubeconfig, &config, &ctx).await,
            Commands::Delete(args) => run_delete(args, self.kubeconfig).await,
        }
    }
}

async fn run_apply(
    args: ApplyArgs,
    kubeconfig: Option<PathBuf>,
    config: &Config,
    ctx: &WaitContext,
) -> Result<()> {
    let paths = &args.crds.crds_paths;
    info!("Applying CRDs from {} path(s): {:?}", paths.len(), paths);

    let objects = ManifestLoader::new()
        .strict(args.crds.strict)
        .load(paths)
        .with_context(|| format!("failed to apply CRDs: cannot load {:?}", paths))?;

    let client = create_client(kubeconfig.as_deref()).await?;
    let reconciler = CrdReconciler::new(KubeCrdClient::new(client))
        .with_policy(args.crds.policy())
        .with_concurrency(usize::from(args.crds.concurrency));

    reconciler
        .process(&objects, Operation::Apply)
        .await
        .context("failed to apply CRDs")?;

    if args.wait_established {
        let names: Vec<String> = objects.iter().map(|o| o.name.clone()).collect();
        let timeout = args
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(config.wait_timeout);
        wait_for_established(reconciler.client(), &names, config.poll_interval, timeout, ctx)
            .await
            .context("failed to apply CRDs")?;
    }

    info!("Successfully applied CRDs");
    Ok(())
}

async fn run_delete(args: CrdArgs, kubeconfig: Option<PathBuf>) -> Result<()> {
    let paths = &args.crds_paths;
    info!("Deleting CRDs from {} path(s): {:?}", paths.len(), paths);

    let objects = ManifestLoader::new()
        .strict(args.strict)
        .load(paths)
        .with_context(|| format!("failed to delete CRDs: cannot load {:?}", paths))?;

    let client = create_client(kubeconfig.as_deref()).await?;
    CrdReconciler::new(KubeCrdClient::new(client))
        .with_policy(args.policy())
        .with_concurrency(usize::from(args.concurrency))
        .process(&objects, Operation::Delete)
        .await
        .context("failed to delete CRDs")?;

    info!("Successfully deleted CRDs");
    Ok(())
}
