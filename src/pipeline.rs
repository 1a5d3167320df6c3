//! Load -> flatten -> route, once per batch version

use crate::cache::FrameCache;
use crate::flatten::{FlatTable, FlattenConfig, Flattener};
use crate::layout::DataLayout;
use crate::loader::{load_batch, LoadOptions};
use crate::route::{partition, PersistReport, SqliteStore};
use crate::types::{BatchVersion, DocumentKind};
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Configuration for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Batch to process; the most recent extracted version when omitted
    pub version: Option<BatchVersion>,
    pub load: LoadOptions,
    pub flatten: FlattenConfig,
    /// Flatten from the documents even when a cached frame exists
    pub refresh: bool,
}

/// The flattened tables of one batch, one per document kind
#[derive(Debug, Clone)]
pub struct BatchTables {
    pub version: BatchVersion,
    pub info: FlatTable,
    pub innings: FlatTable,
}

impl BatchTables {
    pub fn table(&self, kind: DocumentKind) -> &FlatTable {
        match kind {
            DocumentKind::Info => &self.info,
            DocumentKind::Innings => &self.innings,
        }
    }
}

/// Result of persisting one document kind
#[derive(Debug)]
pub struct KindSummary {
    pub kind: DocumentKind,
    pub rows: usize,
    pub report: PersistReport,
}

/// Pick the configured version, or the newest one already extracted
pub fn resolve_version(layout: &DataLayout, version: Option<&BatchVersion>) -> Result<BatchVersion> {
    if let Some(version) = version {
        return Ok(version.clone());
    }
    DataLayout::latest_version(&layout.interim_dir())?
        .context("No extracted batch found; run `extract` first or pass --version")
}

/// Flatten both document kinds of a batch, reusing cached frames when allowed
pub fn flatten_batch(
    layout: &DataLayout,
    version: &BatchVersion,
    config: &PipelineConfig,
) -> Result<BatchTables> {
    let cache = FrameCache::new(layout);

    // A limited run is a partial batch and never reads or feeds the cache
    let use_cache = !config.refresh && config.load.limit.is_none();
    let id_column = config.flatten.id_column.as_str();
    if use_cache {
        if let (Some(info), Some(innings)) = (
            cache.read(version, DocumentKind::Info, id_column)?,
            cache.read(version, DocumentKind::Innings, id_column)?,
        ) {
            info!(%version, "using cached frames");
            return Ok(BatchTables {
                version: version.clone(),
                info,
                innings,
            });
        }
    }

    let batch = load_batch(layout, version, &config.load)
        .with_context(|| format!("Failed to load batch {}", version))?;
    if batch.is_empty() {
        warn!(%version, "batch has no documents; relations will only hold the id column");
    }
    info!(%version, documents = batch.len(), "loaded batch");

    let flatten_kind = |kind: DocumentKind| -> Result<FlatTable> {
        let table = Flattener::for_kind(kind, config.flatten.clone())
            .flatten(batch.documents(kind))
            .with_context(|| format!("Failed to flatten {} records", kind))?;
        if config.load.limit.is_none() {
            cache.write(version, kind, &table)?;
        }
        Ok(table)
    };

    let info = flatten_kind(DocumentKind::Info)?;
    let innings = flatten_kind(DocumentKind::Innings)?;

    Ok(BatchTables {
        version: version.clone(),
        info,
        innings,
    })
}

/// Route each kind's table into relations and replace them in its database
pub fn persist_batch(layout: &DataLayout, tables: &BatchTables) -> Result<Vec<KindSummary>> {
    std::fs::create_dir_all(layout.sqlite_dir())
        .context("Failed to create sqlite directory")?;

    let mut summaries = Vec::new();
    for kind in DocumentKind::ALL {
        let table = tables.table(kind);
        let partitions = partition(table, kind.primary_table())
            .with_context(|| format!("Failed to partition {} table", kind))?;

        let path = layout.database(kind);
        let mut store = SqliteStore::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let report = store.persist(&partitions);

        for (table_name, error) in &report.failures {
            warn!(%kind, table = %table_name, %error, "relation not persisted");
        }

        summaries.push(KindSummary {
            kind,
            rows: table.height(),
            report,
        });
    }

    Ok(summaries)
}

/// Run the whole pipeline for one batch version
pub fn run(layout: &DataLayout, config: &PipelineConfig) -> Result<Vec<KindSummary>> {
    layout.init()?;
    let version = resolve_version(layout, config.version.as_ref())?;
    info!(%version, "processing batch");

    let tables = flatten_batch(layout, &version, config)?;
    persist_batch(layout, &tables)
}
