// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::reconcilers::ReconcileReport;
use crate::wait::CancelCause;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CrdError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to build Kubernetes client: {0}")]
    KubeconfigError(String),

    #[error("Cannot read manifest path {}: {source}", path.display())]
    DiscoveryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {} (document {document}): {message}", path.display())]
    ParseError {
        path: PathBuf,
        document: usize,
        message: String,
    },

    #[error("{}", report.failure_summary())]
    ReconcileError { report: ReconcileReport },

    #[error("Timed out after {timeout:?} waiting for {what}")]
    WaitTimeout { what: String, timeout: Duration },

    #[error("Stopped waiting for {what}: {cause}")]
    WaitCancelled { what: String, cause: CancelCause },

    #[error("Failed while waiting for {what}: {source}")]
    WaitFailed {
        what: String,
        #[source]
        source: BoxError,
    },
}

impl CrdError {
    pub(crate) fn parse(path: impl Into<PathBuf>, document: usize, message: impl Into<String>) -> Self {
        CrdError::ParseError {
            path: path.into(),
            document,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrdError>;

/// True when the API server answered 404
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

/// True when a create raced with another writer and the object already exists
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists")
}

/// True when an update was rejected because the resourceVersion was stale
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409 && resp.reason != "AlreadyExists")
}
