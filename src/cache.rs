//! Frame cache: flattened tables stored per (version, kind, id column)

use crate::flatten::FlatTable;
use crate::layout::DataLayout;
use crate::types::{BatchVersion, DocumentKind};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

/// Reads and writes flattened tables under the layout's cache directory
pub struct FrameCache {
    dir: PathBuf,
}

impl FrameCache {
    pub fn new(layout: &DataLayout) -> Self {
        FrameCache {
            dir: layout.cache_dir(),
        }
    }

    /// The id column names the join key of every relation, so it is part of
    /// the cache key
    pub fn path(&self, version: &BatchVersion, kind: DocumentKind, id_column: &str) -> PathBuf {
        self.dir.join(format!("{}_{}_{}.json", version, kind, id_column))
    }

    /// Load a cached table, or `None` when nothing is cached for the key
    pub fn read(
        &self,
        version: &BatchVersion,
        kind: DocumentKind,
        id_column: &str,
    ) -> Result<Option<FlatTable>> {
        let path = self.path(version, kind, id_column);
        if !path.is_file() {
            return Ok(None);
        }

        let file = File::open(&path)
            .with_context(|| format!("Failed to open cached frame: {}", path.display()))?;
        let table: FlatTable = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse cached frame: {}", path.display()))?;
        if table.id_column != id_column {
            debug!(path = %path.display(), found = %table.id_column, "cached frame has another id column; ignored");
            return Ok(None);
        }

        debug!(path = %path.display(), "read cached frame");
        Ok(Some(table))
    }

    pub fn write(&self, version: &BatchVersion, kind: DocumentKind, table: &FlatTable) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .context("Failed to create cache directory")?;

        let path = self.path(version, kind, &table.id_column);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create cached frame: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, table)
            .context("Failed to serialize frame")?;
        writer.flush().context("Failed to flush cached frame")?;

        debug!(path = %path.display(), "wrote cached frame");
        Ok(())
    }
}
