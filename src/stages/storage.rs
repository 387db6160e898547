// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Move the report volume from ephemeral storage onto a durable claim.

use crate::collaborators::WorkloadStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::metrics_config::{EmbeddedPersistentVolumeClaim, StorageStatus};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Volume};
use kube::ResourceExt;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

/// Where the report volume lives
#[derive(Debug, Clone)]
pub struct StorageTarget {
    pub namespace: String,
    pub deployment: String,
    pub volume_name: String,
}

impl From<&Config> for StorageTarget {
    fn from(config: &Config) -> Self {
        StorageTarget {
            namespace: config.namespace.clone(),
            deployment: config.deployment.clone(),
            volume_name: config.volume_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Volume already backed by the desired claim
    Mounted,
    /// Deployment patched; its pods will roll onto the claim
    Patched,
}

/// Short description of what backs a volume
pub fn volume_type(volume: &Volume) -> String {
    if let Some(pvc) = &volume.persistent_volume_claim {
        format!("PersistentVolumeClaim({})", pvc.claim_name)
    } else if volume.empty_dir.is_some() {
        "EmptyDir".to_string()
    } else {
        "Other".to_string()
    }
}

/// Locate a volume slot by name
pub fn find_volume<'a>(volumes: &'a [Volume], name: &str) -> Result<(usize, &'a Volume)> {
    volumes
        .iter()
        .enumerate()
        .find(|(_, v)| v.name == name)
        .ok_or_else(|| Error::VolumeNotFound(name.to_string()))
}

pub fn is_mounted_on(volume: &Volume, claim_name: &str) -> bool {
    volume
        .persistent_volume_claim
        .as_ref()
        .is_some_and(|pvc| pvc.claim_name == claim_name)
}

/// Strategic merge patch that swaps the named volume's backing for the claim.
///
/// Volumes merge on `name`, so no other volume or field of the deployment is touched.
/// Every backing source currently set on the volume is nulled out.
pub fn volume_patch(volume: &Volume, claim_name: &str) -> Result<Value> {
    let mut entry = Map::new();
    if let Value::Object(current) = serde_json::to_value(volume)? {
        for key in current.keys().filter(|k| k.as_str() != "name") {
            entry.insert(key.clone(), Value::Null);
        }
    }
    entry.insert("name".to_string(), json!(volume.name));
    entry.insert("persistentVolumeClaim".to_string(), json!({ "claimName": claim_name }));

    Ok(json!({
        "spec": {
            "template": {
                "spec": {
                    "volumes": [Value::Object(entry)]
                }
            }
        }
    }))
}

/// Create the claim unless it already exists
#[instrument(skip(store, claim), fields(claim = %claim.name_any()))]
pub async fn ensure_claim(store: &dyn WorkloadStore, claim: &PersistentVolumeClaim) -> Result<()> {
    let namespace = claim.namespace().unwrap_or_default();
    let name = claim.name_any();

    match store.get_claim(&namespace, &name).await {
        Ok(Some(_)) => {
            debug!("PVC {}/{} already exists", namespace, name);
            Ok(())
        }
        Ok(None) => {
            info!("Creating PVC {}/{}", namespace, name);
            store
                .create_claim(claim)
                .await
                .map_err(|e| Error::ClaimCreation(e.to_string()))
        }
        Err(e) => Err(Error::ClaimCreation(e.to_string())),
    }
}

/// Make sure the report volume is backed by the claim built from `template`
#[instrument(skip_all, fields(deployment = %target.deployment, volume = %target.volume_name))]
pub async fn convert_to_claim(
    store: &dyn WorkloadStore,
    target: &StorageTarget,
    template: &EmbeddedPersistentVolumeClaim,
    status: &mut StorageStatus,
) -> Result<MountState> {
    let claim = template.to_claim(&target.namespace);
    let claim_name = claim.name_any();

    let deployment = store
        .get_deployment(&target.namespace, &target.deployment)
        .await
        .map_err(|e| Error::WorkloadLookup(e.to_string()))?;

    let volumes = deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(|s| s.volumes.as_deref().unwrap_or_default())
        .unwrap_or_default();

    let (_, volume) = find_volume(volumes, &target.volume_name)?;
    status.volume_type = volume_type(volume);

    if is_mounted_on(volume, &claim_name) {
        debug!("Volume {} already mounted on PVC {}", target.volume_name, claim_name);
        status.volume_mounted = true;
        return Ok(MountState::Mounted);
    }

    status.volume_mounted = false;
    ensure_claim(store, &claim).await?;

    let patch = volume_patch(volume, &claim_name)?;
    store
        .patch_deployment(&target.namespace, &target.deployment, &patch)
        .await
        .map_err(|e| Error::WorkloadPatch(e.to_string()))?;

    info!(
        "Patched deployment {}/{} to mount PVC {}",
        target.namespace, target.deployment, claim_name
    );
    Ok(MountState::Patched)
}
