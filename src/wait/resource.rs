// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Waits on the `status.state` of a named resource.

use crate::constants::states;
use crate::error::Result;
use crate::wait::{ConditionPoller, WaitContext};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{info, instrument};

/// Resources that report a single state string in their status
pub trait ObservedState {
    fn observed_state(&self) -> Option<&str>;
}

/// Polls a resource by name until its observed state matches a target
pub struct StateWaiter<K> {
    api: Api<K>,
    interval: Duration,
}

impl<K> StateWaiter<K>
where
    K: Resource + ObservedState + Clone + DeserializeOwned + Debug,
    K::DynamicType: Default,
{
    pub fn new(api: Api<K>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Wait until `status.state == target` and return the resource as seen then.
    ///
    /// Any error while reading the resource, including not-found, ends the wait.
    #[instrument(skip(self, ctx))]
    pub async fn wait_for_state(
        &self,
        ctx: &WaitContext,
        name: &str,
        target: &str,
        timeout: Duration,
    ) -> Result<K> {
        info!("Waiting for {} to reach state '{}'", name, target);

        let poller = ConditionPoller::new(
            format!("{} {} to reach state '{}'", K::kind(&Default::default()), name, target),
            self.interval,
            timeout,
        );
        poller
            .wait(
                ctx,
                || self.api.get(name),
                |resource: &K| resource.observed_state() == Some(target),
            )
            .await
    }

    pub async fn wait_for_ready(&self, ctx: &WaitContext, name: &str, timeout: Duration) -> Result<K> {
        self.wait_for_state(ctx, name, states::READY, timeout).await
    }

    pub async fn wait_for_upgrade_done(
        &self,
        ctx: &WaitContext,
        name: &str,
        timeout: Duration,
    ) -> Result<K> {
        self.wait_for_state(ctx, name, states::UPGRADE_DONE, timeout).await
    }
}
