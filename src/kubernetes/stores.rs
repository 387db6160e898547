// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes API backed collaborator implementations

use crate::collaborators::{ClusterIdentity, ConfigStore, SecretData, SecretStore, WorkloadStore};
use crate::constants::OPERATOR_NAME;
use crate::error::{Error, Result};
use crate::types::{KokuMetricsConfig, KokuMetricsConfigStatus};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret};
use kube::{
    api::{ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

const CLUSTER_VERSION_NAME: &str = "version";

/// JSON merge patch turning `previous` into `current`; keys missing from `current` are sent as `null`
pub fn merge_patch(previous: &Value, current: &Value) -> Value {
    match (previous, current) {
        (Value::Object(prev), Value::Object(curr)) => {
            let mut patch = serde_json::Map::new();
            for (key, value) in curr {
                let entry = match prev.get(key) {
                    Some(old) => merge_patch(old, value),
                    None => value.clone(),
                };
                patch.insert(key.clone(), entry);
            }
            for key in prev.keys().filter(|k| !curr.contains_key(*k)) {
                patch.insert(key.clone(), Value::Null);
            }
            Value::Object(patch)
        }
        _ => current.clone(),
    }
}

/// Status merge patch that also clears fields dropped since `previous`
pub fn status_patch(
    previous: Option<&KokuMetricsConfigStatus>,
    current: Option<&KokuMetricsConfigStatus>,
) -> Result<Value> {
    let previous = serde_json::to_value(previous)?;
    let current = serde_json::to_value(current)?;
    Ok(json!({ "status": merge_patch(&previous, &current) }))
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    }
}

pub struct KubeConfigStore {
    client: Client,
}

impl KubeConfigStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigStore for KubeConfigStore {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<Option<KokuMetricsConfig>> {
        let api: Api<KokuMetricsConfig> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    #[instrument(skip(self, config, previous), fields(name = %config.name_any()))]
    async fn persist_status(
        &self,
        config: &KokuMetricsConfig,
        previous: Option<&KokuMetricsConfigStatus>,
    ) -> Result<()> {
        let namespace = config.namespace().unwrap_or_default();
        let api: Api<KokuMetricsConfig> = Api::namespaced(self.client.clone(), &namespace);
        let patch = status_patch(previous, config.status.as_ref())?;

        api.patch_status(&config.name_any(), &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::StatusPersist(e.to_string()))?;
        debug!("Persisted status of {}/{}", namespace, config.name_any());
        Ok(())
    }
}

pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    #[instrument(skip(self))]
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let qualified = format!("{}/{}", namespace, name);

        let secret = match secrets.get(name).await {
            Ok(s) => s,
            Err(kube::Error::Api(err)) if err.code == 404 => {
                return Err(Error::SecretNotFound(qualified))
            }
            Err(kube::Error::Api(err)) if err.code == 403 => {
                return Err(Error::SecretForbidden(qualified))
            }
            Err(e) => return Err(Error::SecretRead(qualified, e.to_string())),
        };

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect())
    }
}

/// Reads the cluster ID from the OpenShift `ClusterVersion` resource
pub struct ClusterVersionClient {
    client: Client,
}

impl ClusterVersionClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterIdentity for ClusterVersionClient {
    #[instrument(skip(self))]
    async fn cluster_id(&self) -> Result<String> {
        let gvk = GroupVersionKind::gvk("config.openshift.io", "v1", "ClusterVersion");
        let resource = ApiResource::from_gvk(&gvk);
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        let version = api
            .get(CLUSTER_VERSION_NAME)
            .await
            .map_err(|e| Error::ClusterIdentity(e.to_string()))?;

        let id = version
            .data
            .get("spec")
            .and_then(|s| s.get("clusterID"))
            .and_then(|id| id.as_str())
            .unwrap_or_default();
        if id.is_empty() {
            return Err(Error::ClusterIdentity(
                "ClusterVersion has no spec.clusterID".to_string(),
            ));
        }

        info!("Found cluster ID {}", id);
        Ok(id.to_string())
    }
}

pub struct KubeWorkloadStore {
    client: Client,
}

impl KubeWorkloadStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkloadStore for KubeWorkloadStore {
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_claim(&self, claim: &PersistentVolumeClaim) -> Result<()> {
        let namespace = claim.namespace().unwrap_or_default();
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), claim).await?;
        Ok(())
    }

    async fn patch_deployment(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &patch_params(), &Patch::Strategic(patch))
            .await?;
        Ok(())
    }
}
