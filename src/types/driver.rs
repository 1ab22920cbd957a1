// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::states;
use crate::wait::ObservedState;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "nvidia.com",
    version = "v1alpha1",
    kind = "NVIDIADriver",
    plural = "nvidiadrivers"
)]
#[kube(status = "NvidiaDriverStatus")]
#[serde(rename_all = "camelCase")]
pub struct NvidiaDriverSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NvidiaDriverStatus {
    #[serde(default)]
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// The derive names the struct after the kind
pub type NvidiaDriver = NVIDIADriver;

impl NvidiaDriver {
    /// True once the operator reports every driver pod as ready
    pub fn is_ready(&self) -> bool {
        self.observed_state() == Some(states::READY)
    }

    /// The driver version set in `spec.version`
    pub fn requested_version(&self) -> Option<&str> {
        self.spec.version.as_deref()
    }
}

impl ObservedState for NvidiaDriver {
    fn observed_state(&self) -> Option<&str> {
        self.status
            .as_ref()
            .map(|s| s.state.as_str())
            .filter(|s| !s.is_empty())
    }
}
