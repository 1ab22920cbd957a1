// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes client creation

use crate::error::{CrdError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::path::Path;
use tracing::{debug, instrument};

/// Create a client from an explicit kubeconfig file, or infer one from the
/// environment (`KUBECONFIG`, `~/.kube/config`, in-cluster service account)
#[instrument]
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            debug!("Loading kubeconfig from {}", path.display());
            let parsed = Kubeconfig::read_from(path).map_err(|e| {
                CrdError::KubeconfigError(format!(
                    "Failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            KConfig::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
                .await
                .map_err(|e| CrdError::KubeconfigError(format!("Failed to create config: {}", e)))?
        }
        None => KConfig::infer()
            .await
            .map_err(|e| CrdError::KubeconfigError(format!("Failed to infer config: {}", e)))?,
    };

    debug!("Using cluster {}", config.cluster_url);
    Client::try_from(config)
        .map_err(|e| CrdError::KubeconfigError(format!("Failed to create client: {}", e)))
}
