// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shared reconciler context and the state carried between invocations.

use crate::collaborators::{
    ClusterIdentity, ConfigStore, MetricsCollector, Packager, PrometheusConnection, SecretStore,
    SourceRegistrar, UploadTransport, WorkloadStore,
};
use crate::collector::PrometheusCollector;
use crate::config::Config;
use crate::dirconfig::DirectoryConfig;
use crate::error::Result;
use crate::kubernetes::{ClusterVersionClient, KubeConfigStore, KubeSecretStore, KubeWorkloadStore};
use crate::packaging::DirectoryPackager;
use crate::sources::HttpSourceRegistrar;
use crate::transport::ReqwestUploadTransport;
use crate::types::SourceSpec;
use kube::Client;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Values remembered from one invocation to the next
#[derive(Debug, Default)]
pub struct RunState {
    /// Source definition seen by the previous invocation
    pub previous_source: Option<SourceSpec>,
    pub prometheus: Option<PrometheusConnection>,
    pub dirs: Option<DirectoryConfig>,
}

impl RunState {
    /// Reuse the known directory layout while it is intact, recreate it otherwise
    pub fn directories(&mut self, config: &Config) -> Result<DirectoryConfig> {
        if let Some(dirs) = self.dirs.as_ref().filter(|d| d.exists()) {
            return Ok(dirs.clone());
        }
        info!("Preparing report directories under {}", config.data_dir.display());
        let dirs = DirectoryConfig::ensure(&config.data_dir)?;
        self.dirs = Some(dirs.clone());
        Ok(dirs)
    }
}

pub struct Context {
    pub config: Config,
    pub configs: Arc<dyn ConfigStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub identity: Arc<dyn ClusterIdentity>,
    pub workloads: Arc<dyn WorkloadStore>,
    pub sources: Arc<dyn SourceRegistrar>,
    pub collector: Arc<dyn MetricsCollector>,
    pub packager: Arc<dyn Packager>,
    pub transport: Arc<dyn UploadTransport>,
    pub state: Mutex<RunState>,
}

impl Context {
    /// Context backed by the Kubernetes API and the upstream HTTP services
    pub fn new(client: Client, config: Config) -> Self {
        Context {
            configs: Arc::new(KubeConfigStore::new(client.clone())),
            secrets: Arc::new(KubeSecretStore::new(client.clone())),
            identity: Arc::new(ClusterVersionClient::new(client.clone())),
            workloads: Arc::new(KubeWorkloadStore::new(client)),
            sources: Arc::new(HttpSourceRegistrar::new()),
            collector: Arc::new(PrometheusCollector::new(&config.service_account_token_path)),
            packager: Arc::new(DirectoryPackager::new()),
            transport: Arc::new(ReqwestUploadTransport::new()),
            state: Mutex::new(RunState::default()),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_directories_are_reused_and_recreated() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            data_dir: tmp.path().join("reports"),
            ..Default::default()
        };
        let mut state = RunState::default();

        let first = state.directories(&config).unwrap();
        assert!(first.exists());
        assert_eq!(state.directories(&config).unwrap(), first);

        fs::remove_dir_all(&first.parent).unwrap();
        let recreated = state.directories(&config).unwrap();
        assert!(recreated.exists());
    }
}
