// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery and the API backed collaborators.

pub mod crd;
pub mod stores;

pub use crd::wait_for_metrics_config_crd;
pub use stores::{ClusterVersionClient, KubeConfigStore, KubeSecretStore, KubeWorkloadStore};
