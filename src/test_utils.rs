// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and the reconciler collaborators.

use crate::collaborators::{
    ClusterIdentity, ConfigStore, MetricsCollector, PackageRequest, Packager,
    PrometheusConnection, PrometheusSettings, ReportWindow, SecretData, SecretStore, SourceCheck,
    SourceRegistrar, UploadReceipt, UploadTransport, WorkloadStore,
};
use crate::dirconfig::{list_files, DirectoryConfig};
use crate::error::{Error, Result};
use crate::stages::auth::AuthConfig;
use crate::types::{KokuMetricsConfig, KokuMetricsConfigStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{Request, Response};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Secret,
    Volume,
};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PATCH requests matching the path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Method and path of every request received, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
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
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        self.calls.lock().unwrap().push((method.clone(), path.clone()));

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A Kubernetes `Status` failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Create a mock secret JSON response
pub fn secret_json(namespace: &str, name: &str, data: &[(&str, &str)]) -> String {
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    };
    serde_json::to_string(&secret).unwrap()
}

/// A deployment whose pod template declares the given volumes
pub fn deployment_with_volumes(volumes: Vec<Volume>) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some("manager".to_string()),
            namespace: Some("koku".to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            template: PodTemplateSpec {
                spec: Some(PodSpec {
                    volumes: Some(volumes),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeConfigStore {
    stored: Mutex<Option<KokuMetricsConfig>>,
    attempted: Mutex<Vec<KokuMetricsConfig>>,
    persisted: Mutex<Vec<KokuMetricsConfig>>,
    fail_persist: bool,
}

impl FakeConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KokuMetricsConfig) -> Self {
        Self {
            stored: Mutex::new(Some(config)),
            ..Default::default()
        }
    }

    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    /// Every config passed to `persist_status`, including failed attempts
    pub fn attempted(&self) -> Vec<KokuMetricsConfig> {
        self.attempted.lock().unwrap().clone()
    }

    pub fn persisted(&self) -> Vec<KokuMetricsConfig> {
        self.persisted.lock().unwrap().clone()
    }

    pub fn persist_count(&self) -> usize {
        self.persisted.lock().unwrap().len()
    }
}

#[async_trait]
impl ConfigStore for FakeConfigStore {
    async fn fetch(&self, _namespace: &str, _name: &str) -> Result<Option<KokuMetricsConfig>> {
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn persist_status(
        &self,
        config: &KokuMetricsConfig,
        _previous: Option<&KokuMetricsConfigStatus>,
    ) -> Result<()> {
        self.attempted.lock().unwrap().push(config.clone());
        if self.fail_persist {
            return Err(Error::StatusPersist("the server rejected the update".to_string()));
        }
        self.persisted.lock().unwrap().push(config.clone());
        *self.stored.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSecretStore {
    secrets: HashMap<(String, String), SecretData>,
    fetches: AtomicUsize,
}

impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let data: BTreeMap<String, Vec<u8>> = data
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
        self.secrets.insert((namespace.to_string(), name.to_string()), data);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::SecretNotFound(format!("{}/{}", namespace, name)))
    }
}

pub struct FakeClusterIdentity {
    id: String,
    calls: AtomicUsize,
}

impl FakeClusterIdentity {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterIdentity for FakeClusterIdentity {
    async fn cluster_id(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.id.clone())
    }
}

/// In-memory deployment and claims; patches are applied to the stored deployment
pub struct FakeWorkloadStore {
    deployment: Mutex<Deployment>,
    claims: Mutex<HashSet<String>>,
    created: Mutex<Vec<String>>,
    patches: AtomicUsize,
    fail_create: bool,
}

impl FakeWorkloadStore {
    pub fn new(deployment: Deployment) -> Self {
        Self {
            deployment: Mutex::new(deployment),
            claims: Mutex::new(HashSet::new()),
            created: Mutex::new(Vec::new()),
            patches: AtomicUsize::new(0),
            fail_create: false,
        }
    }

    pub fn with_existing_claim(self, name: &str) -> Self {
        self.claims.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn patch_count(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }

    pub fn created_claims(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn deployment(&self) -> Deployment {
        self.deployment.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkloadStore for FakeWorkloadStore {
    async fn get_deployment(&self, _namespace: &str, _name: &str) -> Result<Deployment> {
        Ok(self.deployment())
    }

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>> {
        if !self.claims.lock().unwrap().contains(name) {
            return Ok(None);
        }
        Ok(Some(PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    async fn create_claim(&self, claim: &PersistentVolumeClaim) -> Result<()> {
        if self.fail_create {
            return Err(Error::ClaimCreation("quota exceeded".to_string()));
        }
        self.claims.lock().unwrap().insert(claim.name_any());
        self.created.lock().unwrap().push(claim.name_any());
        Ok(())
    }

    async fn patch_deployment(
        &self,
        _namespace: &str,
        _name: &str,
        patch: &serde_json::Value,
    ) -> Result<()> {
        self.patches.fetch_add(1, Ordering::SeqCst);

        let entries = patch["spec"]["template"]["spec"]["volumes"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let mut deployment = self.deployment.lock().unwrap();
        let volumes = deployment
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
            .and_then(|s| s.volumes.as_mut());

        if let Some(volumes) = volumes {
            for entry in entries {
                let name = entry["name"].as_str().unwrap_or_default();
                let claim = entry["persistentVolumeClaim"]["claimName"]
                    .as_str()
                    .unwrap_or_default();
                if let Some(slot) = volumes.iter_mut().find(|v| v.name == name) {
                    *slot = Volume {
                        name: name.to_string(),
                        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                            claim_name: claim.to_string(),
                            read_only: None,
                        }),
                        ..Default::default()
                    };
                }
            }
        }
        Ok(())
    }
}

pub struct FakeSourceRegistrar {
    error: Mutex<Option<Error>>,
    calls: AtomicUsize,
}

impl FakeSourceRegistrar {
    pub fn defined() -> Self {
        Self {
            error: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails the next check with `error`
    pub fn failing(error: Error) -> Self {
        Self {
            error: Mutex::new(Some(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceRegistrar for FakeSourceRegistrar {
    async fn check_or_create(&self, _status: &KokuMetricsConfigStatus, _auth: &AuthConfig) -> SourceCheck {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let error = self.error.lock().unwrap().take();
        SourceCheck {
            defined: error.is_none(),
            checked_at: Utc::now(),
            error,
        }
    }
}

#[derive(Default)]
pub struct FakeCollector {
    windows: Mutex<Vec<ReportWindow>>,
    connects: AtomicUsize,
    fail_next: AtomicBool,
    unreachable: bool,
}

impl FakeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_reports(self) -> Self {
        self.fail_next.store(true, Ordering::SeqCst);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Windows passed to `generate_reports`, including failed ones
    pub fn windows(&self) -> Vec<ReportWindow> {
        self.windows.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsCollector for FakeCollector {
    async fn connect(&self, settings: &PrometheusSettings) -> Result<PrometheusConnection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(Error::PrometheusConnection("connection refused".to_string()));
        }
        Ok(PrometheusConnection {
            settings: settings.clone(),
            client: reqwest::Client::new(),
            bearer_token: None,
        })
    }

    async fn generate_reports(
        &self,
        _connection: &PrometheusConnection,
        window: &ReportWindow,
        _dirs: &DirectoryConfig,
    ) -> Result<()> {
        self.windows.lock().unwrap().push(*window);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Collection("query timed out".to_string()));
        }
        Ok(())
    }
}

/// Records packaging requests and lists the real upload directory
#[derive(Default)]
pub struct FakePackager {
    requests: Mutex<Vec<PackageRequest>>,
    error: Mutex<Option<Error>>,
}

impl FakePackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next packaging run with `error`
    pub fn failing(self, error: Error) -> Self {
        *self.error.lock().unwrap() = Some(error);
        self
    }

    pub fn requests(&self) -> Vec<PackageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Packager for FakePackager {
    fn package_reports(&self, _dirs: &DirectoryConfig, request: &PackageRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        match self.error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn list_uploadable_files(&self, dirs: &DirectoryConfig) -> Result<Vec<String>> {
        list_files(&dirs.upload)
    }
}

/// Answers uploads from a queue of canned responses; the last one repeats
pub struct FakeTransport {
    responses: Mutex<VecDeque<(String, DateTime<Utc>)>>,
    uploads: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeTransport {
    pub fn responding(status: &str, time: DateTime<Utc>) -> Self {
        Self::sequence(vec![(status, time)])
    }

    pub fn sequence(responses: Vec<(&str, DateTime<Utc>)>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(s, t)| (s.to_string(), t))
                    .collect(),
            ),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// URL and file of every upload attempt
    pub fn uploads(&self) -> Vec<(String, PathBuf)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadTransport for FakeTransport {
    async fn upload(&self, _auth: &AuthConfig, url: &str, file: &Path) -> Result<UploadReceipt> {
        self.uploads
            .lock()
            .unwrap()
            .push((url.to_string(), file.to_path_buf()));

        let (status, time) = {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            }
        }
        .unwrap_or_else(|| ("202 Accepted".to_string(), Utc::now()));

        let error = (!status.starts_with("202")).then(|| Error::Upload(status.clone()));
        Ok(UploadReceipt {
            status,
            time,
            error,
        })
    }
}
