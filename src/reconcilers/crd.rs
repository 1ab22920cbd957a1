// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD reconciler - applies or deletes a set of loaded CRDs against the cluster.
//!
//! Objects are handled in load order and independently of each other. No
//! dependency ordering is computed; callers whose custom resources refer to
//! each other must order their manifests accordingly.

use crate::error::{is_already_exists, is_conflict, is_not_found, CrdError, Result};
use crate::kubernetes::CrdClient;
use crate::manifests::CrdObject;
use futures::stream::{self, StreamExt};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

/// What to do with every loaded CRD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create when absent, update when present
    Apply,
    /// Remove, treating an absent CRD as already removed
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Apply => write!(f, "apply"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// How the reconciler reacts to a failed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Attempt every object, then report all failures together
    #[default]
    ContinueOnError,
    /// Stop at the first failed object
    StopOnFirstError,
}

/// Result of reconciling a single CRD
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Deleted,
    /// Already in the desired state
    NoOp,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectResult {
    pub name: String,
    pub source: PathBuf,
    pub outcome: Outcome,
}

/// Per-object outcomes of one run, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub operation: Operation,
    pub results: Vec<ObjectResult>,
    /// Objects never attempted because the run stopped early
    pub skipped: usize,
}

impl ReconcileReport {
    fn count(&self, want: fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| want(&r.outcome)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Created))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Updated))
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Deleted))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, Outcome::NoOp))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ObjectResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Turn a report with failures into a [`CrdError::ReconcileError`]
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CrdError::ReconcileError { report: self })
        }
    }

    pub(crate) fn failure_summary(&self) -> String {
        let details: Vec<String> = self
            .results
            .iter()
            .filter_map(|r| match &r.outcome {
                Outcome::Failed(reason) => {
                    Some(format!("{} ({}): {}", r.name, r.source.display(), reason))
                }
                _ => None,
            })
            .collect();
        let mut summary = format!(
            "failed to {} {} CRD(s): {}",
            self.operation,
            details.len(),
            details.join("; ")
        );
        if self.skipped > 0 {
            summary.push_str(&format!(" ({} not attempted)", self.skipped));
        }
        summary
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} created, {} updated, {} deleted, {} unchanged, {} failed",
            self.operation,
            self.created(),
            self.updated(),
            self.deleted(),
            self.unchanged(),
            self.failures().count()
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Applies or deletes CRDs through a [`CrdClient`]
pub struct CrdReconciler<C> {
    client: C,
    policy: FailurePolicy,
    concurrency: usize,
}

impl<C: CrdClient + Sync> CrdReconciler<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            policy: FailurePolicy::default(),
            concurrency: 1,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run up to `n` objects at once. Only used with
    /// [`FailurePolicy::ContinueOnError`]; results keep input order.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Reconcile every object with `op`.
    ///
    /// Returns the report when all objects succeeded, otherwise a
    /// [`CrdError::ReconcileError`] carrying the full report.
    pub async fn process(&self, objects: &[CrdObject], op: Operation) -> Result<ReconcileReport> {
        info!("Processing {} CRD(s) with operation {}", objects.len(), op);

        let mut report = ReconcileReport {
            operation: op,
            results: Vec::with_capacity(objects.len()),
            skipped: 0,
        };

        match self.policy {
            FailurePolicy::ContinueOnError if self.concurrency > 1 => {
                report.results = stream::iter(objects)
                    .map(|object| self.process_one(object, op))
                    .buffered(self.concurrency)
                    .collect::<Vec<_>>()
                    .await;
            }
            FailurePolicy::ContinueOnError => {
                for object in objects {
                    report.results.push(self.process_one(object, op).await);
                }
            }
            FailurePolicy::StopOnFirstError => {
                for (idx, object) in objects.iter().enumerate() {
                    let result = self.process_one(object, op).await;
                    let failed = matches!(result.outcome, Outcome::Failed(_));
                    report.results.push(result);
                    if failed {
                        report.skipped = objects.len() - idx - 1;
                        warn!("Stopping after first failure, {} CRD(s) not attempted", report.skipped);
                        break;
                    }
                }
            }
        }

        info!("{}", report);
        report.into_result()
    }

    #[instrument(skip(self, object), fields(crd = %object.name))]
    async fn process_one(&self, object: &CrdObject, op: Operation) -> ObjectResult {
        let action = match op {
            Operation::Apply => self.apply(object).await,
            Operation::Delete => self.delete(object).await,
        };

        let outcome = match action {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to {} CRD {}: {}", op, object.name, e);
                Outcome::Failed(e.to_string())
            }
        };

        ObjectResult {
            name: object.name.clone(),
            source: object.source.clone(),
            outcome,
        }
    }

    async fn apply(&self, object: &CrdObject) -> std::result::Result<Outcome, kube::Error> {
        let name = object.name.as_str();

        if let Some(existing) = self.client.get(name).await? {
            return self.update(object, existing).await;
        }

        match self.client.create(&object.crd).await {
            Ok(_) => {
                info!("Created CRD {}", name);
                Ok(Outcome::Created)
            }
            Err(e) if is_already_exists(&e) => {
                debug!("CRD {} appeared concurrently, updating instead", name);
                match self.client.get(name).await? {
                    Some(existing) => self.update(object, existing).await,
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Replace `existing` with the desired body, retrying once on a stale
    /// resourceVersion
    async fn update(
        &self,
        object: &CrdObject,
        existing: CustomResourceDefinition,
    ) -> std::result::Result<Outcome, kube::Error> {
        let name = object.name.as_str();

        if is_up_to_date(&existing, &object.crd) {
            debug!("CRD {} is up to date", name);
            return Ok(Outcome::NoOp);
        }

        match self.client.replace(name, &desired_from(object, &existing)).await {
            Ok(_) => {
                info!("Updated CRD {}", name);
                Ok(Outcome::Updated)
            }
            Err(e) if is_conflict(&e) => {
                debug!("Conflict updating CRD {}, retrying with a fresh copy", name);
                let Some(fresh) = self.client.get(name).await? else {
                    return Err(e);
                };
                if is_up_to_date(&fresh, &object.crd) {
                    return Ok(Outcome::NoOp);
                }
                self.client
                    .replace(name, &desired_from(object, &fresh))
                    .await?;
                info!("Updated CRD {} after conflict", name);
                Ok(Outcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, object: &CrdObject) -> std::result::Result<Outcome, kube::Error> {
        match self.client.delete(&object.name).await {
            Ok(()) => {
                info!("Deleted CRD {}", object.name);
                Ok(Outcome::Deleted)
            }
            Err(e) if is_not_found(&e) => {
                debug!("CRD {} is already absent", object.name);
                Ok(Outcome::NoOp)
            }
            Err(e) => Err(e),
        }
    }
}

/// The desired body carrying the server's resourceVersion, so the update is
/// accepted against the copy that was read
fn desired_from(object: &CrdObject, existing: &CustomResourceDefinition) -> CustomResourceDefinition {
    let mut desired = object.crd.clone();
    desired.metadata.resource_version = existing.metadata.resource_version.clone();
    desired
}

fn is_up_to_date(existing: &CustomResourceDefinition, desired: &CustomResourceDefinition) -> bool {
    existing.spec == desired.spec
        && existing.metadata.labels == desired.metadata.labels
        && existing.metadata.annotations == desired.metadata.annotations
}
