// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::anyhow;
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crdctl::cli::Cli;
use crdctl::config::Config;
use crdctl::wait::WaitContext;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(mut config) => {
            config.debug |= cli.debug;
            config
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing; RUST_LOG takes precedence over --debug
    let level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let ctx = WaitContext::new();
    let result = tokio::select! {
        res = cli.run(config, ctx.clone()) => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling");
            ctx.cancel();
            Err(anyhow!("interrupted"))
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
