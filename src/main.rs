// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use koku_metrics_operator::config::Config;
use koku_metrics_operator::kubernetes::wait_for_metrics_config_crd;
use koku_metrics_operator::reconcilers::{Context, MetricsConfigReconciler};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting koku-metrics-operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, deployment={}, data_dir={}",
        config.namespace,
        config.deployment,
        config.data_dir.display()
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for KokuMetricsConfig CRD to become available...");
    wait_for_metrics_config_crd(&client).await?;

    let context = Context::new(client.clone(), config);
    MetricsConfigReconciler::new(client, context).run().await?;

    warn!("Reconciler stopped unexpectedly");
    Ok(())
}
