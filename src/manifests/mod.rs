// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Discovery and parsing of CustomResourceDefinition manifests.

pub mod loader;

pub use loader::{CrdObject, ManifestLoader};
