// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of loaded CRDs against the cluster.

pub mod crd;

pub use crd::{CrdReconciler, FailurePolicy, ObjectResult, Operation, Outcome, ReconcileReport};
