// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::storage;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared configuration of the metering pipeline
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(
    group = "koku-metrics-cfg.openshift.io",
    version = "v1alpha1",
    kind = "KokuMetricsConfig",
    shortname = "kmc"
)]
#[kube(namespaced)]
#[kube(status = "KokuMetricsConfigStatus")]
#[serde(rename_all = "snake_case", default)]
pub struct KokuMetricsConfigSpec {
    pub api_url: String,
    pub authentication: AuthenticationSpec,
    pub packaging: PackagingSpec,
    pub upload: UploadSpec,
    pub source: SourceSpec,
    pub prometheus_config: PrometheusSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_claim_template: Option<EmbeddedPersistentVolumeClaim>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Token,
    Basic,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Token => write!(f, "token"),
            AuthType::Basic => write!(f, "basic"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct AuthenticationSpec {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    pub secret_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(default)]
pub struct PackagingSpec {
    /// Upper bound in megabytes of report data per bundle
    #[serde(rename = "max_size_MB", skip_serializing_if = "Option::is_none")]
    pub max_size_mb: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct UploadSpec {
    pub ingress_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_toggle: Option<bool>,
    /// Minutes between uploads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_cycle: Option<i64>,
    /// Seconds to pause before uploading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_wait: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_cert: Option<bool>,
}

/// Remote source record representing this cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct SourceSpec {
    pub sources_path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_source: Option<bool>,
    /// Minutes between source checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_cycle: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct PrometheusSpec {
    pub service_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_tls_verification: Option<bool>,
}

/// A PersistentVolumeClaim template embedded in the resource
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddedPersistentVolumeClaim {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub metadata: EmbeddedObjectMetadata,
    pub spec: PersistentVolumeClaimSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddedObjectMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl EmbeddedPersistentVolumeClaim {
    /// Built-in claim: single writer, 10Gi
    pub fn default_claim() -> Self {
        EmbeddedPersistentVolumeClaim {
            api_version: Some("v1".to_string()),
            kind: Some("PersistentVolumeClaim".to_string()),
            metadata: EmbeddedObjectMetadata {
                name: storage::DEFAULT_CLAIM_NAME.to_string(),
                ..Default::default()
            },
            spec: PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_string(),
                        Quantity(storage::DEFAULT_CLAIM_SIZE.to_string()),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    /// Produce the claim object to create in the given namespace
    pub fn to_claim(&self, namespace: &str) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(self.metadata.name.clone()),
                namespace: Some(namespace.to_string()),
                labels: self.metadata.labels.clone(),
                annotations: self.metadata.annotations.clone(),
                ..Default::default()
            },
            spec: Some(self.spec.clone()),
            status: None,
        }
    }
}

impl KokuMetricsConfig {
    /// The claim template declared in the spec, or the built-in default
    pub fn claim_template(&self) -> EmbeddedPersistentVolumeClaim {
        self.spec
            .volume_claim_template
            .clone()
            .unwrap_or_else(EmbeddedPersistentVolumeClaim::default_claim)
    }
}

/// Observed and working values, plus per-stage bookkeeping
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct KokuMetricsConfigStatus {
    pub api_url: String,
    pub authentication: AuthenticationStatus,
    pub packaging: PackagingStatus,
    pub upload: UploadStatus,
    pub source: SourceStatus,
    pub prometheus: PrometheusStatus,
    pub reports: ReportsStatus,
    pub storage: StorageStatus,
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    pub operator_commit: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct AuthenticationStatus {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    pub secret_name: String,
    /// Unset until credentials have been looked up once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_found: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct PackagingStatus {
    #[serde(rename = "max_size_MB")]
    pub max_size_mb: i64,
    pub packaging_error: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct UploadStatus {
    pub ingress_path: String,
    pub upload: bool,
    pub upload_cycle: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_wait: Option<i64>,
    pub validate_cert: bool,
    pub last_upload_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_upload_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_successful_upload_time: Option<DateTime<Utc>>,
    pub upload_error: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct SourceStatus {
    pub sources_path: String,
    pub name: String,
    pub create_source: bool,
    pub check_cycle: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_defined: Option<bool>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check_time: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct PrometheusStatus {
    pub service_address: String,
    pub skip_tls_verification: bool,
    pub prometheus_connected: bool,
    pub connection_error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_query_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_query_success_time: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct ReportsStatus {
    pub data_collected: bool,
    pub data_collection_message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", default)]
pub struct StorageStatus {
    pub volume_type: String,
    pub volume_mounted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<EmbeddedPersistentVolumeClaim>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(spec: KokuMetricsConfigSpec) -> KokuMetricsConfig {
        let mut cfg = KokuMetricsConfig::new("kmc", spec);
        cfg.metadata.namespace = Some("koku-metrics-operator".to_string());
        cfg
    }

    #[test]
    fn test_empty_spec_deserializes() {
        let spec: KokuMetricsConfigSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, KokuMetricsConfigSpec::default());
        assert_eq!(spec.authentication.auth_type, AuthType::Token);
    }

    #[test]
    fn test_spec_from_yaml() {
        let yaml = r#"
api_url: https://console.example.com
authentication:
  type: basic
  secret_name: my-auth
upload:
  upload_cycle: 60
  upload_toggle: false
source:
  name: my-cluster
  create_source: true
packaging:
  max_size_MB: 50
prometheus_config:
  skip_tls_verification: true
"#;
        let spec: KokuMetricsConfigSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.api_url, "https://console.example.com");
        assert_eq!(spec.authentication.auth_type, AuthType::Basic);
        assert_eq!(spec.authentication.secret_name, "my-auth");
        assert_eq!(spec.upload.upload_cycle, Some(60));
        assert_eq!(spec.upload.upload_toggle, Some(false));
        assert_eq!(spec.source.name, "my-cluster");
        assert_eq!(spec.source.create_source, Some(true));
        assert_eq!(spec.packaging.max_size_mb, Some(50));
        assert_eq!(spec.prometheus_config.skip_tls_verification, Some(true));
    }

    #[test]
    fn test_claim_template_default() {
        let cfg = make_config(KokuMetricsConfigSpec::default());
        let template = cfg.claim_template();
        assert_eq!(template.metadata.name, "koku-metrics-operator-data");

        let claim = template.to_claim("koku-metrics-operator");
        let spec = claim.spec.unwrap();
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        let requests = spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests.get("storage"), Some(&Quantity("10Gi".to_string())));
        assert_eq!(claim.metadata.namespace.as_deref(), Some("koku-metrics-operator"));
    }

    #[test]
    fn test_claim_template_declared() {
        let mut template = EmbeddedPersistentVolumeClaim::default_claim();
        template.metadata.name = "custom-claim".to_string();
        template.metadata.labels = Some(BTreeMap::from([("app".to_string(), "koku".to_string())]));
        let cfg = make_config(KokuMetricsConfigSpec {
            volume_claim_template: Some(template),
            ..Default::default()
        });

        let claim = cfg.claim_template().to_claim("ns");
        assert_eq!(claim.metadata.name.as_deref(), Some("custom-claim"));
        assert_eq!(
            claim.metadata.labels.unwrap().get("app").map(String::as_str),
            Some("koku")
        );
    }

    #[test]
    fn test_status_round_trips_cluster_id_key() {
        let status = KokuMetricsConfigStatus {
            cluster_id: "abc".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["clusterID"], "abc");
        assert!(value["authentication"].get("credentials_found").is_none());
    }

    #[test]
    fn test_auth_type_display() {
        assert_eq!(AuthType::Token.to_string(), "token");
        assert_eq!(AuthType::Basic.to_string(), "basic");
    }
}
