// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResourceExt;

use koku_metrics_operator::types::KokuMetricsConfig;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&KokuMetricsConfig::crd())?);
    Ok(())
}
