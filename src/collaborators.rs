// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Interfaces to everything the reconciler talks to.
//!
//! The reconciler only sees these traits; the Kubernetes and HTTP backed
//! implementations live in [`crate::kubernetes`], [`crate::transport`],
//! [`crate::sources`], [`crate::collector`] and [`crate::packaging`].

use crate::dirconfig::DirectoryConfig;
use crate::error::{Error, Result};
use crate::stages::auth::AuthConfig;
use crate::types::{KokuMetricsConfig, KokuMetricsConfigStatus};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use std::collections::BTreeMap;
use std::path::Path;

/// Raw secret contents keyed by data key
pub type SecretData = BTreeMap<String, Vec<u8>>;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the resource; `None` when it no longer exists
    async fn fetch(&self, namespace: &str, name: &str) -> Result<Option<KokuMetricsConfig>>;

    /// Write `config.status`; fields present in `previous` but unset now are cleared
    async fn persist_status(
        &self,
        config: &KokuMetricsConfig,
        previous: Option<&KokuMetricsConfigStatus>,
    ) -> Result<()>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fails with [`Error::SecretNotFound`], [`Error::SecretForbidden`] or [`Error::SecretRead`]
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData>;
}

#[async_trait]
pub trait ClusterIdentity: Send + Sync {
    async fn cluster_id(&self) -> Result<String>;
}

#[async_trait]
pub trait WorkloadStore: Send + Sync {
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment>;

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>>;

    async fn create_claim(&self, claim: &PersistentVolumeClaim) -> Result<()>;

    /// Apply a strategic merge patch to the deployment
    async fn patch_deployment(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<()>;
}

/// Outcome of checking the upstream source record
#[derive(Debug)]
pub struct SourceCheck {
    pub defined: bool,
    pub checked_at: DateTime<Utc>,
    pub error: Option<Error>,
}

#[async_trait]
pub trait SourceRegistrar: Send + Sync {
    /// Look up the source named in `status.source`, creating it when allowed
    async fn check_or_create(&self, status: &KokuMetricsConfigStatus, auth: &AuthConfig) -> SourceCheck;
}

/// Connection parameters for the metrics backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrometheusSettings {
    pub address: String,
    pub skip_tls_verification: bool,
}

/// A live handle to the metrics backend, reused across invocations
#[derive(Debug, Clone)]
pub struct PrometheusConnection {
    pub settings: PrometheusSettings,
    pub client: reqwest::Client,
    pub bearer_token: Option<String>,
}

/// One-hour collection window with per-minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Open and verify a connection
    async fn connect(&self, settings: &PrometheusSettings) -> Result<PrometheusConnection>;

    /// Write report files for the window into the reports directory
    async fn generate_reports(
        &self,
        connection: &PrometheusConnection,
        window: &ReportWindow,
        dirs: &DirectoryConfig,
    ) -> Result<()>;
}

/// Inputs to a packaging run
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub max_size_mb: i64,
    pub cluster_id: String,
    pub operator_commit: String,
}

pub trait Packager: Send + Sync {
    /// Bundle pending reports into the upload directory
    fn package_reports(&self, dirs: &DirectoryConfig, request: &PackageRequest) -> Result<()>;

    /// File names currently waiting in the upload directory
    fn list_uploadable_files(&self, dirs: &DirectoryConfig) -> Result<Vec<String>>;
}

/// What the ingestion endpoint said about one upload attempt
#[derive(Debug)]
pub struct UploadReceipt {
    /// Textual HTTP status, e.g. `202 Accepted`; empty if no response arrived
    pub status: String,
    pub time: DateTime<Utc>,
    pub error: Option<Error>,
}

impl UploadReceipt {
    pub fn accepted(&self) -> bool {
        self.error.is_none() && self.status.starts_with("202")
    }
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// POST the file as a multipart body; `Err` only when the body could not be built
    async fn upload(&self, auth: &AuthConfig, url: &str, file: &Path) -> Result<UploadReceipt>;
}
