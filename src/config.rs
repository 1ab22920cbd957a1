// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

use crate::constants::polling::{POLL_INTERVAL_SECS, WAIT_TIMEOUT_SECS};

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub debug: bool,
    /// Interval between two checks while waiting on a condition
    pub poll_interval: Duration,
    /// Default upper bound for waits when no timeout flag is given
    pub wait_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debug: false,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            wait_timeout: Duration::from_secs(WAIT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let debug = lookup("DEBUG").is_some_and(|v| parse_flag(&v));

        let poll_interval = match lookup("CRDCTL_POLL_INTERVAL_SECS") {
            Some(v) => {
                let secs = parse_secs("CRDCTL_POLL_INTERVAL_SECS", &v)?;
                if secs == 0 {
                    bail!("CRDCTL_POLL_INTERVAL_SECS must be at least 1");
                }
                Duration::from_secs(secs)
            }
            None => defaults.poll_interval,
        };

        let wait_timeout = match lookup("CRDCTL_WAIT_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_secs("CRDCTL_WAIT_TIMEOUT_SECS", &v)?),
            None => defaults.wait_timeout,
        };

        Ok(Config {
            debug,
            poll_interval,
            wait_timeout,
        })
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} is not a number: {value}"))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
