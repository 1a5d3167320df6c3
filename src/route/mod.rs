//! Table routing - split flat tables into relations and persist them
//!
//! Columns without a dot stay in the primary table of their document kind;
//! dotted columns move to a satellite table named after their prefix. Every
//! relation carries the id column so they can be joined back together.

pub mod partition;
pub mod sqlite;

pub use partition::{partition, plan_partitions, Partition, PartitionPlan, RouteError};
pub use sqlite::{PersistError, PersistReport, SqliteStore};
