//! Retrieval and extraction of the source archive

use crate::layout::DataLayout;
use crate::types::BatchVersion;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_ARCHIVE_URL: &str = "https://cricsheet.org/downloads/all.zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no archive for version {0}")]
    MissingArchive(BatchVersion),
}

/// Download the archive at `url`
pub fn fetch_archive(url: &str) -> Result<Vec<u8>, ArchiveError> {
    info!(url, "downloading archive");
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let bytes = response.bytes()?;
    Ok(bytes.to_vec())
}

/// Download today's archive into `raw/<today>.zip`
pub fn save_todays_archive(layout: &DataLayout, url: &str) -> Result<BatchVersion, ArchiveError> {
    let version = BatchVersion::today();
    let bytes = fetch_archive(url)?;

    let path = layout.raw_archive(&version);
    std::fs::create_dir_all(layout.raw_dir())?;
    std::fs::write(&path, &bytes)?;

    info!(path = %path.display(), bytes = bytes.len(), "saved archive");
    Ok(version)
}

/// Unpack `raw/<version>.zip` into `interim/<version>/`
pub fn extract_archive(layout: &DataLayout, version: &BatchVersion) -> Result<usize, ArchiveError> {
    let path = layout.raw_archive(version);
    if !path.is_file() {
        return Err(ArchiveError::MissingArchive(version.clone()));
    }

    let bytes = std::fs::read(&path)?;
    extract_bytes(&bytes, &layout.version_dir(version))
}

/// Unpack an in-memory zip archive into `dest`, returning the entry count
pub fn extract_bytes(bytes: &[u8], dest: &Path) -> Result<usize, ArchiveError> {
    std::fs::create_dir_all(dest)?;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let entries = archive.len();
    archive.extract(dest)?;

    info!(dest = %dest.display(), entries, "extracted archive");
    Ok(entries)
}
