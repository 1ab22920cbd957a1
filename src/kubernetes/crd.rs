// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CustomResourceDefinition access and availability checking

use crate::error::Result;
use crate::wait::{ConditionPoller, WaitContext};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    api::{DeleteParams, PostParams},
    Api, Client,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// The cluster operations the reconciler needs, keyed by CRD name.
///
/// Errors are returned untouched so callers can tell not-found and
/// conflict answers apart.
pub trait CrdClient {
    /// Fetch a CRD, `None` when it does not exist
    fn get(
        &self,
        name: &str,
    ) -> impl Future<Output = std::result::Result<Option<CustomResourceDefinition>, kube::Error>> + Send;

    fn create(
        &self,
        crd: &CustomResourceDefinition,
    ) -> impl Future<Output = std::result::Result<CustomResourceDefinition, kube::Error>> + Send;

    /// Replace a CRD; `crd` must carry the resourceVersion it was read at
    fn replace(
        &self,
        name: &str,
        crd: &CustomResourceDefinition,
    ) -> impl Future<Output = std::result::Result<CustomResourceDefinition, kube::Error>> + Send;

    fn delete(&self, name: &str) -> impl Future<Output = std::result::Result<(), kube::Error>> + Send;
}

/// [`CrdClient`] backed by the cluster API
#[derive(Clone)]
pub struct KubeCrdClient {
    api: Api<CustomResourceDefinition>,
}

impl KubeCrdClient {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

impl CrdClient for KubeCrdClient {
    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> std::result::Result<Option<CustomResourceDefinition>, kube::Error> {
        self.api.get_opt(name).await
    }

    #[instrument(skip(self, crd), fields(crd = ?crd.metadata.name))]
    async fn create(
        &self,
        crd: &CustomResourceDefinition,
    ) -> std::result::Result<CustomResourceDefinition, kube::Error> {
        self.api.create(&post_params(), crd).await
    }

    #[instrument(skip(self, crd))]
    async fn replace(
        &self,
        name: &str,
        crd: &CustomResourceDefinition,
    ) -> std::result::Result<CustomResourceDefinition, kube::Error> {
        self.api.replace(name, &post_params(), crd).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> std::result::Result<(), kube::Error> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(crate::constants::FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Check whether a CRD reports the `Established=True` condition
pub fn is_established(crd: &CustomResourceDefinition) -> bool {
    crd.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Established" && c.status == "True")
        })
}

/// Wait until every named CRD is served by the API server.
///
/// A CRD that does not exist yet counts as not established.
#[instrument(skip(client, names, ctx), fields(count = names.len()))]
pub async fn wait_for_established<C: CrdClient + Sync>(
    client: &C,
    names: &[String],
    interval: Duration,
    timeout: Duration,
    ctx: &WaitContext,
) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }

    info!("Waiting for {} CRD(s) to become established...", names.len());

    let poller = ConditionPoller::new(
        format!("{} CRD(s) to be established", names.len()),
        interval,
        timeout,
    );
    poller
        .wait(
            ctx,
            || async move {
                let mut pending = Vec::new();
                for name in names {
                    match client.get(name).await? {
                        Some(crd) if is_established(&crd) => {}
                        _ => pending.push(name.clone()),
                    }
                }
                Ok::<_, kube::Error>(pending)
            },
            |pending: &Vec<String>| {
                if !pending.is_empty() {
                    debug!("CRDs not yet established: {:?}", pending);
                }
                pending.is_empty()
            },
        )
        .await?;

    info!("All {} CRD(s) are established", names.len());
    Ok(())
}
