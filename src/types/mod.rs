// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types.

pub mod metrics_config;

pub use metrics_config::{
    AuthType, EmbeddedPersistentVolumeClaim, KokuMetricsConfig, KokuMetricsConfigSpec,
    KokuMetricsConfigStatus, SourceSpec,
};
