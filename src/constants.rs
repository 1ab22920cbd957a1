// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The CLI name, also used as field manager on writes
pub const FIELD_MANAGER: &str = "crdctl";

/// Manifest discovery settings
pub mod manifests {
    /// File extensions considered manifests when walking a directory
    pub const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];
    /// apiVersion group of CustomResourceDefinition documents
    pub const CRD_API_GROUP: &str = "apiextensions.k8s.io";
    pub const CRD_KIND: &str = "CustomResourceDefinition";
}

/// Condition polling configuration
pub mod polling {
    /// Default interval between two checks of a condition
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Default upper bound for a single wait
    pub const WAIT_TIMEOUT_SECS: u64 = 300;
}

/// Values of `status.state` observed on driver resources
pub mod states {
    pub const READY: &str = "ready";
    pub const UPGRADE_DONE: &str = "upgrade-done";
}
