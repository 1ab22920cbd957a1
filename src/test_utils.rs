// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use crate::kubernetes::CrdClient;
use crate::manifests::CrdObject;
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, CustomResourceDefinitionCondition, CustomResourceDefinitionStatus,
};
use kube::client::Body;
use kube::error::ErrorResponse;
use kube::Client;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

type Responses = HashMap<(String, String), VecDeque<(u16, String)>>;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<Responses>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            bodies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, responses: Vec<(u16, String)>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), responses.into());
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, vec![(status, body.to_string())])
    }

    /// Answer successive GETs with successive responses; the last one repeats
    pub fn on_get_sequence(self, path: &str, responses: Vec<(u16, String)>) -> Self {
        self.on("GET", path, responses)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, vec![(status, body.to_string())])
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, vec![(status, body.to_string())])
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, vec![(status, body.to_string())])
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    /// (method, path) of every request received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Body of the most recent request that carried one
    pub fn last_body(&self) -> Option<String> {
        self.bodies.lock().unwrap().last().cloned()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();

        let exact = (method.to_string(), path.to_string());
        let key = if responses.contains_key(&exact) {
            exact
        } else {
            // Try prefix match for paths like /apis/group/version/resources/name
            responses
                .keys()
                .find(|(m, p)| m == method && path.starts_with(p.as_str()))
                .cloned()?
        };
        let queue = responses.get_mut(&key)?;

        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);
        let bodies = self.bodies.clone();

        Box::pin(async move {
            let body = req.into_body().collect().await?.to_bytes();
            if !body.is_empty() {
                bodies
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&body).into_owned());
            }

            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// A minimal apiextensions/v1 CRD manifest named `<plural>.<group>`
pub fn crd_yaml(plural: &str, group: &str, kind: &str) -> String {
    format!(
        r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: {plural}.{group}
spec:
  group: {group}
  names:
    kind: {kind}
    plural: {plural}
  scope: Namespaced
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
"#
    )
}

/// The JSON body the API server would return for the CRD `name`
pub fn crd_json(name: &str) -> String {
    let (plural, group) = name.split_once('.').unwrap_or((name, "example.com"));
    let mut kind: String = plural.trim_end_matches('s').to_string();
    if let Some(first) = kind.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    let value: serde_json::Value = serde_yaml::from_str(&crd_yaml(plural, group, &kind)).unwrap();
    value.to_string()
}

pub fn crd_object(plural: &str, group: &str, kind: &str) -> CrdObject {
    let crd: CustomResourceDefinition = serde_yaml::from_str(&crd_yaml(plural, group, kind)).unwrap();
    CrdObject {
        name: format!("{plural}.{group}"),
        source: PathBuf::from(format!("crds/{plural}.yaml")),
        document: 1,
        crd,
    }
}

/// A CRD status reporting `Established=True`
pub fn established() -> Option<CustomResourceDefinitionStatus> {
    Some(CustomResourceDefinitionStatus {
        conditions: Some(vec![CustomResourceDefinitionCondition {
            type_: "Established".to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    })
}

/// An NVIDIADriver as returned by the API server
pub fn driver_json(name: &str, state: &str) -> String {
    serde_json::json!({
        "apiVersion": "nvidia.com/v1alpha1",
        "kind": "NVIDIADriver",
        "metadata": {"name": name, "resourceVersion": "7"},
        "spec": {"driverType": "gpu", "version": "550.54.15"},
        "status": {"state": state}
    })
    .to_string()
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("injected {reason}"),
        reason: reason.to_string(),
        code,
    })
}

/// A call received by [`FakeCrdClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeOp {
    Get(String),
    Create(String),
    Replace(String),
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<String, CustomResourceDefinition>,
    next_version: u64,
    ops: Vec<FakeOp>,
    failures: HashMap<String, (u16, String)>,
    conflicts: HashMap<String, u32>,
    vanish_on_conflict: HashSet<String>,
    appear_on_create: HashMap<String, CustomResourceDefinition>,
}

impl FakeState {
    fn store(&mut self, mut crd: CustomResourceDefinition) -> CustomResourceDefinition {
        self.next_version += 1;
        crd.metadata.resource_version = Some(self.next_version.to_string());
        let name = crd.metadata.name.clone().unwrap_or_default();
        self.objects.insert(name, crd.clone());
        crd
    }

    fn injected_failure(&self, name: &str) -> Option<kube::Error> {
        self.failures
            .get(name)
            .map(|(code, reason)| api_error(*code, reason))
    }
}

/// In-memory [`CrdClient`] with optimistic concurrency and fault injection
#[derive(Clone, Default)]
pub struct FakeCrdClient {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCrdClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, crd: CustomResourceDefinition) {
        self.state.lock().unwrap().store(crd);
    }

    pub fn set_status(&self, name: &str, status: Option<CustomResourceDefinitionStatus>) {
        if let Some(crd) = self.state.lock().unwrap().objects.get_mut(name) {
            crd.status = status;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(name)
    }

    pub fn stored(&self, name: &str) -> Option<CustomResourceDefinition> {
        self.state.lock().unwrap().objects.get(name).cloned()
    }

    pub fn resource_version(&self, name: &str) -> Option<String> {
        self.stored(name).and_then(|crd| crd.metadata.resource_version)
    }

    pub fn ops(&self) -> Vec<FakeOp> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Every call touching `name` fails with the given API error
    pub fn fail_on(&self, name: &str, code: u16, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(name.to_string(), (code, reason.to_string()));
    }

    /// The next `times` replaces of `name` fail with a 409 Conflict
    pub fn conflict_on_replace(&self, name: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .conflicts
            .insert(name.to_string(), times);
    }

    /// The injected conflict on `name` comes from another writer deleting it
    pub fn vanish_on_conflict(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .vanish_on_conflict
            .insert(name.to_string());
    }

    /// Simulate another writer creating `crd` just before our create
    pub fn appear_on_create(&self, name: &str, crd: CustomResourceDefinition) {
        self.state
            .lock()
            .unwrap()
            .appear_on_create
            .insert(name.to_string(), crd);
    }
}

impl CrdClient for FakeCrdClient {
    async fn get(&self, name: &str) -> Result<Option<CustomResourceDefinition>, kube::Error> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(FakeOp::Get(name.to_string()));
        if let Some(err) = state.injected_failure(name) {
            return Err(err);
        }
        Ok(state.objects.get(name).cloned())
    }

    async fn create(&self, crd: &CustomResourceDefinition) -> Result<CustomResourceDefinition, kube::Error> {
        let name = crd.metadata.name.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        state.ops.push(FakeOp::Create(name.clone()));
        if let Some(err) = state.injected_failure(&name) {
            return Err(err);
        }
        if let Some(theirs) = state.appear_on_create.remove(&name) {
            state.store(theirs);
        }
        if state.objects.contains_key(&name) {
            return Err(api_error(409, "AlreadyExists"));
        }
        let mut created = crd.clone();
        created.metadata.resource_version = None;
        Ok(state.store(created))
    }

    async fn replace(
        &self,
        name: &str,
        crd: &CustomResourceDefinition,
    ) -> Result<CustomResourceDefinition, kube::Error> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(FakeOp::Replace(name.to_string()));
        if let Some(err) = state.injected_failure(name) {
            return Err(err);
        }
        if let Some(remaining) = state.conflicts.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                // someone else wrote in between
                if state.vanish_on_conflict.contains(name) {
                    state.objects.remove(name);
                } else if let Some(current) = state.objects.get(name).cloned() {
                    state.store(current);
                }
                return Err(api_error(409, "Conflict"));
            }
        }
        let Some(current) = state.objects.get(name) else {
            return Err(api_error(404, "NotFound"));
        };
        if current.metadata.resource_version != crd.metadata.resource_version {
            return Err(api_error(409, "Conflict"));
        }
        Ok(state.store(crd.clone()))
    }

    async fn delete(&self, name: &str) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(FakeOp::Delete(name.to_string()));
        if let Some(err) = state.injected_failure(name) {
            return Err(err);
        }
        match state.objects.remove(name) {
            Some(_) => Ok(()),
            None => Err(api_error(404, "NotFound")),
        }
    }
}
