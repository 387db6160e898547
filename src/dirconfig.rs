// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! On-disk layout for reports, staging and upload files

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directories under the durable report volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub parent: PathBuf,
    /// Freshly collected CSV reports
    pub reports: PathBuf,
    /// Bundles being written
    pub staging: PathBuf,
    /// Finished bundles waiting for upload
    pub upload: PathBuf,
}

impl DirectoryConfig {
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        let parent = parent.into();
        DirectoryConfig {
            reports: parent.join("data").join("reports"),
            staging: parent.join("staging"),
            upload: parent.join("upload"),
            parent,
        }
    }

    /// Create every directory that does not exist yet
    pub fn ensure(parent: impl Into<PathBuf>) -> Result<Self> {
        let cfg = Self::new(parent);
        for dir in [&cfg.parent, &cfg.reports, &cfg.staging, &cfg.upload] {
            if !dir.is_dir() {
                info!("Creating directory {}", dir.display());
                fs::create_dir_all(dir)
                    .map_err(|e| Error::Directory(format!("{}: {}", dir.display(), e)))?;
            }
        }
        debug!("Directory configuration ready under {}", cfg.parent.display());
        Ok(cfg)
    }

    /// True when every directory is still present
    pub fn exists(&self) -> bool {
        [&self.parent, &self.reports, &self.staging, &self.upload]
            .iter()
            .all(|d| d.is_dir())
    }

    pub fn upload_path(&self, file: &str) -> PathBuf {
        self.upload.join(file)
    }
}

/// Sorted names of the regular files in a directory
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
