// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{storage, DEFAULT_REQUEUE_SECS};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace holding the managed deployment and the report claim
    pub namespace: String,
    /// Deployment whose pod template carries the report volume
    pub deployment: String,
    /// Name of the report volume slot
    pub volume_name: String,
    /// Parent directory for reports, staging and upload files
    pub data_dir: PathBuf,
    /// Build identifier reported upstream
    pub git_commit: String,
    pub requeue_after: Duration,
    pub service_account_token_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let requeue_secs: u64 = match env::var("REQUEUE_SECONDS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("REQUEUE_SECONDS is not a number: {}", v))?,
            Err(_) => DEFAULT_REQUEUE_SECS,
        };

        Ok(Config {
            namespace: var_or("OPERATOR_NAMESPACE", storage::DEFAULT_NAMESPACE),
            deployment: var_or("OPERATOR_DEPLOYMENT", storage::DEFAULT_DEPLOYMENT),
            volume_name: var_or("REPORTS_VOLUME_NAME", storage::DEFAULT_VOLUME_NAME),
            data_dir: PathBuf::from(var_or("DATA_DIR", storage::DEFAULT_DATA_DIR)),
            git_commit: var_or("GIT_COMMIT", ""),
            requeue_after: Duration::from_secs(requeue_secs),
            service_account_token_path: PathBuf::from(var_or(
                "SERVICE_ACCOUNT_TOKEN_PATH",
                DEFAULT_TOKEN_PATH,
            )),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: storage::DEFAULT_NAMESPACE.to_string(),
            deployment: storage::DEFAULT_DEPLOYMENT.to_string(),
            volume_name: storage::DEFAULT_VOLUME_NAME.to_string(),
            data_dir: PathBuf::from(storage::DEFAULT_DATA_DIR),
            git_commit: String::new(),
            requeue_after: Duration::from_secs(DEFAULT_REQUEUE_SECS),
            service_account_token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
