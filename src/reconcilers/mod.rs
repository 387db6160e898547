// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod context;
pub mod metrics_config;

pub use context::{Context, RunState};
pub use metrics_config::MetricsConfigReconciler;
