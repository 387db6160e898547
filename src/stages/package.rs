// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bundle collected reports for upload.

use crate::collaborators::{PackageRequest, Packager};
use crate::dirconfig::DirectoryConfig;
use crate::pipeline::StageOutcome;
use crate::scheduler::check_cycle;
use crate::types::KokuMetricsConfigStatus;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Bundle collected reports on the upload cadence
pub fn package_reports(
    packager: &dyn Packager,
    dirs: &DirectoryConfig,
    status: &mut KokuMetricsConfigStatus,
    now: DateTime<Utc>,
) -> StageOutcome {
    if !check_cycle(
        "package",
        status.upload.upload_cycle,
        status.upload.last_successful_upload_time,
        now,
    ) {
        return StageOutcome::Skipped("packaging not due");
    }

    status.packaging.packaging_error.clear();
    let request = PackageRequest {
        max_size_mb: status.packaging.max_size_mb,
        cluster_id: status.cluster_id.clone(),
        operator_commit: status.operator_commit.clone(),
    };

    match packager.package_reports(dirs, &request) {
        Ok(()) => {
            info!("Packaged reports into {}", dirs.upload.display());
            StageOutcome::Completed
        }
        Err(e) => {
            error!("Failed to package files: {}", e);
            status.packaging.packaging_error = e.to_string();
            StageOutcome::Degraded(e)
        }
    }
}
