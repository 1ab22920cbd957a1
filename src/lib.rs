// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod manifests;
pub mod reconcilers;
pub mod types;
pub mod wait;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{CrdError, Result};
