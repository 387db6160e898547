// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ship packaged bundles to the ingestion endpoint.

use crate::collaborators::{Packager, UploadTransport};
use crate::constants::upload::BUNDLE_SUFFIX;
use crate::dirconfig::DirectoryConfig;
use crate::error::{Error, Result};
use crate::pipeline::{concat_errors, StageOutcome};
use crate::scheduler::check_cycle;
use crate::stages::auth::AuthConfig;
use crate::types::KokuMetricsConfigStatus;
use chrono::{DateTime, Utc};
use std::fs;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Upload every bundle in the upload directory when the upload cycle is due
#[instrument(skip_all)]
pub async fn upload_files(
    transport: &dyn UploadTransport,
    packager: &dyn Packager,
    auth: &AuthConfig,
    dirs: &DirectoryConfig,
    status: &mut KokuMetricsConfigStatus,
    now: DateTime<Utc>,
) -> StageOutcome {
    if !status.upload.upload {
        info!("Operator is configured to not upload reports");
        return StageOutcome::Skipped("upload disabled");
    }

    if !check_cycle(
        "upload",
        status.upload.upload_cycle,
        status.upload.last_successful_upload_time,
        now,
    ) {
        return StageOutcome::Skipped("upload not due");
    }

    let files = match packager.list_uploadable_files(dirs) {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to read upload directory: {}", e);
            return StageOutcome::Retryable(e);
        }
    };

    if files.is_empty() {
        info!("No files to upload");
        return StageOutcome::Completed;
    }

    let wait = status.upload.upload_wait.unwrap_or_default().max(0) as u64;
    info!("Pausing for {} seconds before uploading", wait);
    tokio::time::sleep(Duration::from_secs(wait)).await;

    match upload_bundles(transport, auth, dirs, status, &files).await {
        Ok(()) => StageOutcome::Completed,
        Err(e) => StageOutcome::Retryable(e),
    }
}

async fn upload_bundles(
    transport: &dyn UploadTransport,
    auth: &AuthConfig,
    dirs: &DirectoryConfig,
    status: &mut KokuMetricsConfigStatus,
    files: &[String],
) -> Result<()> {
    let url = format!("{}{}", status.api_url, status.upload.ingress_path);
    let mut errors = Vec::new();

    for file in files.iter().filter(|f| f.contains(BUNDLE_SUFFIX)) {
        let path = dirs.upload_path(file);
        info!("Uploading file {} to {}", file, url);

        let receipt = match transport.upload(auth, &url, &path).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Failed to build upload for {}: {}", file, e);
                status.upload.upload_error = e.to_string();
                errors.push(e);
                continue;
            }
        };

        status.upload.upload_error.clear();
        status.upload.last_upload_status = receipt.status.clone();
        status.upload.last_upload_time = Some(receipt.time);

        if let Some(e) = receipt.error {
            error!("Upload of {} failed: {}", file, e);
            status.upload.upload_error = e.to_string();
            errors.push(e);
            continue;
        }

        if receipt.accepted() {
            info!("Upload of {} accepted", file);
            status.upload.last_successful_upload_time = Some(receipt.time);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove uploaded file {}: {}", path.display(), e);
            }
        } else {
            let e = Error::Upload(format!("unexpected response status {}", receipt.status));
            status.upload.upload_error = e.to_string();
            errors.push(e);
        }
    }

    concat_errors(errors)
}
