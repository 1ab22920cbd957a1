// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Polling until cluster state satisfies a condition.

pub mod poller;
pub mod resource;

pub use poller::{CancelCause, ConditionPoller, WaitContext};
pub use resource::{ObservedState, StateWaiter};
