// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("volume {0} not found in deployment")]
    VolumeNotFound(String),

    #[error("failed to get or create PVC: {0}")]
    ClaimCreation(String),

    #[error("failed to patch deployment: {0}")]
    WorkloadPatch(String),

    #[error("unable to get deployment: {0}")]
    WorkloadLookup(String),

    #[error("secret {0} does not exist")]
    SecretNotFound(String),

    #[error("operator does not have permission to read secret {0}")]
    SecretForbidden(String),

    #[error("could not read secret {0}: {1}")]
    SecretRead(String, String),

    #[error("no authentication secret name set when using basic auth")]
    MissingSecretName,

    #[error("{0}")]
    Authentication(String),

    #[error("cluster authorization token is not valid: {0}")]
    InvalidToken(String),

    #[error("failed to obtain cluster ID: {0}")]
    ClusterIdentity(String),

    #[error("source check failed: {0}")]
    SourceCheck(String),

    #[error("failed to get prometheus connection: {0}")]
    PrometheusConnection(String),

    #[error("report collection failed: {0}")]
    Collection(String),

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("failed to get directory configuration: {0}")]
    Directory(String),

    #[error("failed to update KokuMetricsConfig status: {0}")]
    StatusPersist(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{}", .0.join("\n"))]
    Aggregate(Vec<String>),
}

impl Error {
    /// Configuration errors that no amount of retrying will fix
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::MissingSecretName | Error::VolumeNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
