// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for client creation, CRD access and driver resources.

pub mod client;
pub mod crd;
pub mod driver;

pub use client::create_client;
pub use crd::{wait_for_established, CrdClient, KubeCrdClient};
pub use driver::DriverClient;
