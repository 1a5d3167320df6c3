//! On-disk layout of the data directory
//!
//! ```text
//! <root>/raw/<version>.zip          downloaded archives
//! <root>/interim/<version>/         extracted match documents
//! <root>/cache/<version>_<kind>_<id column>.json  flattened frames
//! <root>/sqlite/<kind>.sqlite       persisted relations
//! ```

use crate::types::{BatchVersion, DocumentKind};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static DATE_IN_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap()
});

/// Paths of every directory and file the pipeline reads or writes
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        DataLayout::new("data")
    }
}

impl DataLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DataLayout {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn interim_dir(&self) -> PathBuf {
        self.root.join("interim")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn sqlite_dir(&self) -> PathBuf {
        self.root.join("sqlite")
    }

    /// Directory holding the extracted documents of one version
    pub fn version_dir(&self, version: &BatchVersion) -> PathBuf {
        self.interim_dir().join(version.as_str())
    }

    pub fn raw_archive(&self, version: &BatchVersion) -> PathBuf {
        self.raw_dir().join(format!("{}.zip", version))
    }

    pub fn database(&self, kind: DocumentKind) -> PathBuf {
        self.sqlite_dir().join(format!("{}.sqlite", kind))
    }

    /// Create every directory of the layout that does not exist yet.
    ///
    /// Safe to call on every run.
    pub fn init(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.raw_dir(),
            self.interim_dir(),
            self.cache_dir(),
            self.sqlite_dir(),
        ] {
            if !dir.exists() {
                debug!(dir = %dir.display(), "creating data directory");
            }
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Most recent version found among the entry names of `dir`.
    ///
    /// Works for both `raw/` (`<version>.zip`) and `interim/` (`<version>/`).
    pub fn latest_version(dir: &Path) -> Result<Option<BatchVersion>> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list directory: {}", dir.display()))?;

        let mut latest: Option<BatchVersion> = None;
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            let Some(found) = DATE_IN_NAME_REGEX.find(&name) else {
                continue;
            };
            let Ok(version) = found.as_str().parse::<BatchVersion>() else {
                continue;
            };
            if latest.as_ref().map_or(true, |current| version > *current) {
                latest = Some(version);
            }
        }

        Ok(latest)
    }
}
