//! scorebook: Normalize cricket match documents into SQLite relations
//!
//! Usage:
//!   # Create the data directory tree
//!   scorebook init
//!
//!   # Download today's archive, then unpack it
//!   scorebook fetch
//!   scorebook extract
//!
//!   # Flatten and persist the newest extracted batch
//!   scorebook run
//!
//!   # Quick look at the first 20 documents of a given batch
//!   scorebook flatten --version 2020-03-16 --limit 20

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scorebook::archive::{self, DEFAULT_ARCHIVE_URL};
use scorebook::pipeline::{self, KindSummary, PipelineConfig};
use scorebook::{BatchVersion, DataLayout, DocumentKind, FlattenConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scorebook")]
#[command(about = "Normalize cricket match documents into SQLite relations", long_about = None)]
struct Cli {
    /// Root of the data directory tree
    #[arg(long, global = true, default_value = "data")]
    data_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the data directories that do not exist yet
    Init,

    /// Download today's archive into raw/
    Fetch {
        #[arg(long, default_value = DEFAULT_ARCHIVE_URL)]
        url: String,
    },

    /// Unpack a raw archive into interim/<version>/
    Extract {
        /// Version to unpack (default: newest archive in raw/)
        #[arg(long)]
        version: Option<String>,
    },

    /// Flatten a batch and print its column sets without persisting
    Flatten(BatchArgs),

    /// Flatten a batch and replace its relations in sqlite/
    Run {
        #[command(flatten)]
        batch: BatchArgs,

        /// Download and unpack today's archive first
        #[arg(long)]
        fetch: bool,

        #[arg(long, default_value = DEFAULT_ARCHIVE_URL)]
        url: String,
    },
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Batch version (default: newest extracted batch)
    #[arg(long)]
    version: Option<String>,

    /// Only read the first N documents
    #[arg(long)]
    limit: Option<usize>,

    /// Ignore cached frames and flatten from the documents
    #[arg(long)]
    refresh: bool,

    /// Name of the id column shared by every relation (default: "match_id")
    #[arg(long)]
    id_column: Option<String>,
}

impl BatchArgs {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig {
            version: parse_version(self.version)?,
            load: LoadOptions { limit: self.limit },
            flatten: FlattenConfig::default(),
            refresh: self.refresh,
        };
        if let Some(id_column) = self.id_column {
            config.flatten.id_column = id_column;
        }
        Ok(config)
    }
}

fn parse_version(version: Option<String>) -> Result<Option<BatchVersion>> {
    version
        .map(|v| v.parse::<BatchVersion>().context("Invalid --version"))
        .transpose()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let layout = DataLayout::new(&cli.data_dir);

    match cli.command {
        Command::Init => {
            layout.init()?;
            println!("Initialized {}", layout.root().display());
        }
        Command::Fetch { url } => {
            layout.init()?;
            let version = archive::save_todays_archive(&layout, &url)?;
            println!("Saved {}", layout.raw_archive(&version).display());
        }
        Command::Extract { version } => {
            layout.init()?;
            let version = match parse_version(version)? {
                Some(version) => version,
                None => DataLayout::latest_version(&layout.raw_dir())?
                    .context("No archive in raw/; run `fetch` first")?,
            };
            let entries = archive::extract_archive(&layout, &version)?;
            println!("Extracted {} files into {}", entries, layout.version_dir(&version).display());
        }
        Command::Flatten(batch) => {
            layout.init()?;
            let config = batch.into_config()?;
            let version = pipeline::resolve_version(&layout, config.version.as_ref())?;
            let tables = pipeline::flatten_batch(&layout, &version, &config)?;

            for kind in DocumentKind::ALL {
                let table = tables.table(kind);
                println!("{} ({} rows, {} columns)", kind, table.height(), table.width());
                for name in table.column_names() {
                    println!("  {}", name);
                }
            }
        }
        Command::Run { batch, fetch, url } => {
            let mut config = batch.into_config()?;
            if fetch {
                layout.init()?;
                let version = archive::save_todays_archive(&layout, &url)?;
                archive::extract_archive(&layout, &version)?;
                config.version = Some(version);
            }

            let summaries = pipeline::run(&layout, &config)?;
            print_summaries(&layout, &summaries);

            let failed: usize = summaries.iter().map(|s| s.report.failures.len()).sum();
            if failed > 0 {
                bail!("{} relation(s) failed to persist", failed);
            }
        }
    }

    Ok(())
}

fn print_summaries(layout: &DataLayout, summaries: &[KindSummary]) {
    for summary in summaries {
        println!(
            "{}: {} rows -> {}",
            summary.kind,
            summary.rows,
            layout.database(summary.kind).display()
        );
        for (table, rows) in &summary.report.written {
            println!("  ✓ {} ({} rows)", table, rows);
        }
        for (table, error) in &summary.report.failures {
            println!("  ✗ {}: {}", table, error);
        }
    }
}
