//! Nested records to flat tables
//!
//! Every record of a batch becomes one row. Maps nest into dotted column
//! names, declared list fields expand into positional columns
//! (`team.1`, `team.2`, ...), and each column ends up with a single type.

pub mod codec;
pub mod flattener;
pub mod schema;
pub mod table;

pub use codec::ElementCodec;
pub use flattener::{FlattenConfig, FlattenError, Flattener};
pub use schema::{FieldKind, FieldSchema, ListField, INFO_SCHEMA, INNINGS_SCHEMA};
pub use table::{CellValue, Column, ColumnKind, FlatTable, SEPARATOR};
