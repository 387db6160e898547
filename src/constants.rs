// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name used as patch field manager
pub const OPERATOR_NAME: &str = "koku-metrics-operator";

/// Delay before the next invocation after a clean run
pub const DEFAULT_REQUEUE_SECS: u64 = 300;

/// Requeue delay applied by the error policy
pub const ERROR_REQUEUE_SECS: u64 = 60;

/// CRD polling configuration
pub mod crd {
    /// API group of the KokuMetricsConfig resource
    pub const GROUP: &str = "koku-metrics-cfg.openshift.io";
    /// API version of the KokuMetricsConfig resource
    pub const VERSION: &str = "v1alpha1";
    /// Kind of the KokuMetricsConfig resource
    pub const KIND: &str = "KokuMetricsConfig";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Credential sources
pub mod auth {
    pub const PULL_SECRET_NAMESPACE: &str = "openshift-config";
    pub const PULL_SECRET_NAME: &str = "pull-secret";
    pub const PULL_SECRET_DATA_KEY: &str = ".dockerconfigjson";
    /// Registry host whose credential is used as the upstream bearer token
    pub const PULL_SECRET_AUTH_KEY: &str = "cloud.openshift.com";
    pub const SECRET_USER_KEY: &str = "username";
    pub const SECRET_PASSWORD_KEY: &str = "password";
}

/// Managed workload and storage defaults
pub mod storage {
    pub const DEFAULT_NAMESPACE: &str = "koku-metrics-operator";
    pub const DEFAULT_DEPLOYMENT: &str = "koku-metrics-controller-manager";
    pub const DEFAULT_VOLUME_NAME: &str = "koku-metrics-operator-reports";
    pub const DEFAULT_CLAIM_NAME: &str = "koku-metrics-operator-data";
    pub const DEFAULT_CLAIM_SIZE: &str = "10Gi";
    pub const DEFAULT_DATA_DIR: &str = "/tmp/koku-metrics-operator-reports";
}

/// Defaults applied when projecting the spec into status
pub mod defaults {
    pub const API_URL: &str = "https://cloud.redhat.com";
    pub const INGRESS_PATH: &str = "/api/ingress/v1/upload";
    pub const SOURCES_PATH: &str = "/api/sources/v1.0/";
    pub const PROMETHEUS_ADDRESS: &str = "https://thanos-querier.openshift-monitoring.svc:9091";
    /// Minutes between uploads
    pub const UPLOAD_CYCLE: i64 = 360;
    /// Minutes between source checks
    pub const SOURCE_CHECK_CYCLE: i64 = 1440;
    /// Megabytes of report data per bundle
    pub const MAX_PACKAGE_SIZE: i64 = 100;
    /// Upper bound (exclusive) of the randomized upload wait in seconds
    pub const UPLOAD_WAIT_BOUND: i64 = 35;
}

/// Upload transport constants
pub mod upload {
    pub const BUNDLE_CONTENT_TYPE: &str = "application/vnd.redhat.hccm.tar+tgz";
    /// Marker in a file name identifying a compressed bundle
    pub const BUNDLE_SUFFIX: &str = "tar.gz";
    pub const ACCEPTED: u16 = 202;
}
