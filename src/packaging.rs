// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! tar.gz bundling of collected reports.

use crate::collaborators::{PackageRequest, Packager};
use crate::constants::upload::BUNDLE_SUFFIX;
use crate::dirconfig::{list_files, DirectoryConfig};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const MANIFEST_NAME: &str = "manifest.json";
const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub cluster_id: String,
    pub version: String,
    pub date: DateTime<Utc>,
    pub files: Vec<String>,
}

/// Group files in order so that no group exceeds `max_bytes`, except a single file larger than the limit.
pub fn split_batches(files: Vec<(String, u64)>, max_bytes: u64) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut size: u64 = 0;

    for (name, len) in files {
        if !current.is_empty() && size.saturating_add(len) > max_bytes {
            batches.push(std::mem::take(&mut current));
            size = 0;
        }
        size = size.saturating_add(len);
        current.push(name);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

pub fn bundle_name(created: DateTime<Utc>, index: usize) -> String {
    format!("{}-cost-mgmt-{}.{}", created.format("%Y%m%dT%H%M%S"), index, BUNDLE_SUFFIX)
}

fn write_bundle(target: &Path, dir: &Path, manifest: &Manifest) -> Result<()> {
    let manifest_bytes = serde_json::to_vec_pretty(manifest)?;
    let encoder = GzEncoder::new(File::create(target)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(manifest_bytes.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(manifest.date.timestamp().max(0) as u64);
    header.set_cksum();
    builder.append_data(&mut header, MANIFEST_NAME, manifest_bytes.as_slice())?;

    for name in &manifest.files {
        builder.append_path_with_name(dir.join(name), name)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

/// Packages CSV reports from the reports directory into the upload directory
#[derive(Debug, Default, Clone)]
pub struct DirectoryPackager;

impl DirectoryPackager {
    pub fn new() -> Self {
        DirectoryPackager
    }

    fn package_at(
        &self,
        dirs: &DirectoryConfig,
        request: &PackageRequest,
        created: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut reports = Vec::new();
        for name in list_files(&dirs.reports)? {
            if !name.ends_with(".csv") {
                debug!("Ignoring non-report file {}", name);
                continue;
            }
            let len = fs::metadata(dirs.reports.join(&name))?.len();
            reports.push((name, len));
        }

        if reports.is_empty() {
            info!("No reports to package");
            return Ok(Vec::new());
        }

        let max_bytes = (request.max_size_mb.max(1) as u64).saturating_mul(BYTES_PER_MB);
        let mut bundles = Vec::new();

        for (index, files) in split_batches(reports, max_bytes).into_iter().enumerate() {
            let name = bundle_name(created, index);
            let manifest = Manifest {
                cluster_id: request.cluster_id.clone(),
                version: request.operator_commit.clone(),
                date: created,
                files,
            };

            let staged = dirs.staging.join(&name);
            write_bundle(&staged, &dirs.reports, &manifest)
                .map_err(|e| Error::Packaging(format!("{}: {}", name, e)))?;
            fs::rename(&staged, dirs.upload_path(&name))
                .map_err(|e| Error::Packaging(format!("{}: {}", name, e)))?;

            for file in &manifest.files {
                if let Err(e) = fs::remove_file(dirs.reports.join(file)) {
                    warn!("Failed to remove packaged report {}: {}", file, e);
                }
            }
            info!("Packaged {} reports into {}", manifest.files.len(), name);
            bundles.push(name);
        }

        Ok(bundles)
    }
}

impl Packager for DirectoryPackager {
    #[instrument(skip_all, fields(max_size_mb = request.max_size_mb))]
    fn package_reports(&self, dirs: &DirectoryConfig, request: &PackageRequest) -> Result<()> {
        self.package_at(dirs, request, Utc::now()).map(|_| ())
    }

    fn list_uploadable_files(&self, dirs: &DirectoryConfig) -> Result<Vec<String>> {
        list_files(&dirs.upload)
    }
}
