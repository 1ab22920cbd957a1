// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed access to NVIDIADriver resources

use crate::error::Result;
use crate::types::NvidiaDriver;
use crate::wait::{StateWaiter, WaitContext};
use kube::{
    api::{DeleteParams, ListParams, PostParams},
    Api, Client,
};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Client for the cluster-scoped NVIDIADriver custom resource
pub struct DriverClient {
    api: Api<NvidiaDriver>,
    waiter: StateWaiter<NvidiaDriver>,
}

impl DriverClient {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        let api: Api<NvidiaDriver> = Api::all(client);
        Self {
            waiter: StateWaiter::new(api.clone(), poll_interval),
            api,
        }
    }

    pub async fn get(&self, name: &str) -> Result<NvidiaDriver> {
        Ok(self.api.get(name).await?)
    }

    pub async fn create(&self, driver: &NvidiaDriver) -> Result<NvidiaDriver> {
        Ok(self.api.create(&PostParams::default(), driver).await?)
    }

    /// Replace a driver; it must carry the resourceVersion it was read at
    pub async fn update(&self, driver: &NvidiaDriver) -> Result<NvidiaDriver> {
        let name = driver.metadata.name.clone().unwrap_or_default();
        Ok(self.api.replace(&name, &PostParams::default(), driver).await?)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<NvidiaDriver>> {
        Ok(self.api.list(&ListParams::default()).await?.items)
    }

    /// Read-modify-write of `spec.version`, skipped when already requested
    #[instrument(skip(self))]
    pub async fn update_driver_version(&self, name: &str, version: &str) -> Result<NvidiaDriver> {
        let mut driver = self.get(name).await?;
        if driver.requested_version() == Some(version) {
            debug!("Driver {} already requests version {}", name, version);
            return Ok(driver);
        }
        driver.spec.version = Some(version.to_string());
        let updated = self.update(&driver).await?;
        info!("Driver {} now requests version {}", name, version);
        Ok(updated)
    }

    pub async fn wait_for_ready(
        &self,
        ctx: &WaitContext,
        name: &str,
        timeout: Duration,
    ) -> Result<NvidiaDriver> {
        self.waiter.wait_for_ready(ctx, name, timeout).await
    }

    pub async fn wait_for_upgrade_done(
        &self,
        ctx: &WaitContext,
        name: &str,
        timeout: Duration,
    ) -> Result<NvidiaDriver> {
        self.waiter.wait_for_upgrade_done(ctx, name, timeout).await
    }
}
