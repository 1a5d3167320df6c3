//! # Scorebook - cricket match documents to SQL
//!
//! Normalizes a corpus of nested match documents (one per match) into
//! relational tables.
//!
//! ## Modules
//!
//! - **loader**: parse a batch version's documents into info and innings records
//! - **flatten**: nested records to flat tables with stable column names
//! - **route**: split flat tables into primary and satellite relations, persist them
//! - **archive**, **layout**, **cache**: the data directory around the core
//!
//! ## Quick Start
//!
//! ```rust
//! use scorebook::flatten::{Flattener, FlattenConfig};
//! use scorebook::route::partition;
//! use scorebook::{Document, DocumentKind};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let documents = vec![
//!     Document::new("1001", json!({"city": "Pune", "teams": ["India", "Australia"]})),
//!     Document::new("1002", json!({"city": "Perth", "teams": ["Australia", "England"]})),
//! ];
//!
//! let table = Flattener::for_kind(DocumentKind::Info, FlattenConfig::default())
//!     .flatten(&documents)?;
//! // columns: match_id, city, team.1, team.2
//!
//! let partitions = partition(&table, DocumentKind::Info.primary_table())?;
//! // partitions[0] = matchinfo (match_id, city)
//! // partitions[1] = team (match_id, team.1, team.2)
//! # assert_eq!(partitions.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cache;
pub mod flatten;
pub mod layout;
pub mod loader;
pub mod pipeline;
pub mod route;
pub mod types;

// Re-export commonly used types for convenience
pub use flatten::{CellValue, FlatTable, FlattenConfig, Flattener};
pub use layout::DataLayout;
pub use loader::{load_batch, Batch, LoadOptions};
pub use pipeline::{run, PipelineConfig};
pub use route::{partition, SqliteStore};
pub use types::{BatchVersion, Document, DocumentId, DocumentKind};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_flatten_and_route() {
        let documents = vec![Document::new(
            "1",
            json!({
                "city": "Mumbai",
                "dates": ["2020-1-5"],
                "toss": {"winner": "India", "decision": "bat"}
            }),
        )];

        let table = Flattener::for_kind(DocumentKind::Info, FlattenConfig::default())
            .flatten(&documents)
            .unwrap();
        let partitions = partition(&table, "matchinfo").unwrap();

        let names: Vec<_> = partitions.iter().map(|p| p.table.as_str()).collect();
        assert_eq!(names, vec!["matchinfo", "date", "toss"]);
        assert_eq!(table.cell("1", "date.1").unwrap().as_str(), Some("2020-01-05"));
    }
}
