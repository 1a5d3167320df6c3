//! SQLite persistence for partitioned tables

use crate::flatten::CellValue;
use crate::route::partition::Partition;
use rusqlite::types::{Null, ToSqlOutput};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("partition {0:?} has no columns")]
    EmptyPartition(String),
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::from(Null),
            CellValue::Integer(i) => ToSqlOutput::from(*i),
            CellValue::Real(r) => ToSqlOutput::from(*r),
            CellValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// Outcome of persisting a set of partitions
#[derive(Debug, Default)]
pub struct PersistReport {
    /// Relations written, with their row counts
    pub written: Vec<(String, usize)>,
    pub failures: Vec<(String, PersistError)>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A SQLite database holding the relations of one document kind
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let conn = Connection::open(path)?;
        Ok(SqliteStore { conn })
    }

    pub fn in_memory() -> Result<Self, PersistError> {
        let conn = Connection::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replace every relation named by `partitions`.
    ///
    /// Each partition is written in its own transaction; a failure is
    /// recorded in the report and the remaining partitions are still written.
    pub fn persist(&mut self, partitions: &[Partition]) -> PersistReport {
        let mut report = PersistReport::default();

        for partition in partitions {
            match self.write_partition(partition) {
                Ok(rows) => {
                    info!(table = %partition.table, rows, "replaced relation");
                    report.written.push((partition.table.clone(), rows));
                }
                Err(e) => {
                    warn!(table = %partition.table, error = %e, "failed to write relation");
                    report.failures.push((partition.table.clone(), e));
                }
            }
        }

        report
    }

    fn write_partition(&mut self, partition: &Partition) -> Result<usize, PersistError> {
        if partition.columns.is_empty() {
            return Err(PersistError::EmptyPartition(partition.table.clone()));
        }

        let table = quote_ident(&partition.table);
        let column_defs: Vec<String> = partition
            .columns
            .iter()
            .map(|column| {
                if column.name == partition.id_column {
                    format!("{} TEXT PRIMARY KEY", quote_ident(&column.name))
                } else {
                    format!("{} {}", quote_ident(&column.name), column.kind.sql_type())
                }
            })
            .collect();
        let column_names: Vec<String> = partition
            .columns
            .iter()
            .map(|column| quote_ident(&column.name))
            .collect();
        let placeholders: Vec<String> = (1..=partition.columns.len())
            .map(|i| format!("?{}", i))
            .collect();

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
        tx.execute(
            &format!("CREATE TABLE {} ({})", table, column_defs.join(", ")),
            [],
        )?;

        let rows = partition.height();
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                column_names.join(", "),
                placeholders.join(", ")
            ))?;
            for row in 0..rows {
                let cells = partition.columns.iter().map(|column| &column.values[row]);
                insert.execute(params_from_iter(cells))?;
            }
        }
        tx.commit()?;

        Ok(rows)
    }
}

/// Double-quote an SQL identifier so dots and spaces are legal in it
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{Column, ColumnKind};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn date_partition() -> Partition {
        Partition {
            table: "date".into(),
            id_column: "match_id".into(),
            columns: vec![
                Column::new("match_id", ColumnKind::Text, vec![text("1"), text("2")]),
                Column::new("date.1", ColumnKind::Text, vec![text("2020-01-05"), text("2020-03-15")]),
                Column::new("date.2", ColumnKind::Text, vec![CellValue::Null, text("2020-03-16")]),
            ],
        }
    }

    fn dump(store: &SqliteStore, sql: &str) -> Vec<(String, Option<String>, Option<String>)> {
        let mut stmt = store.connection().prepare(sql).unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        rows
    }

    #[test]
    fn test_persist_dotted_columns() {
        let mut store = SqliteStore::in_memory().unwrap();
        let report = store.persist(&[date_partition()]);
        assert!(report.is_complete());
        assert_eq!(report.written, vec![("date".to_string(), 2)]);

        let rows = dump(&store, r#"SELECT match_id, "date.1", "date.2" FROM "date" ORDER BY match_id"#);
        assert_eq!(
            rows,
            vec![
                ("1".into(), Some("2020-01-05".into()), None),
                ("2".into(), Some("2020-03-15".into()), Some("2020-03-16".into())),
            ]
        );
    }

    #[test]
    fn test_persist_replaces_existing_relation() {
        let mut store = SqliteStore::in_memory().unwrap();
        store
            .connection()
            .execute_batch(r#"CREATE TABLE "date" (stale TEXT); INSERT INTO "date" VALUES ('x');"#)
            .unwrap();

        store.persist(&[date_partition()]);
        store.persist(&[date_partition()]);

        let count: i64 = store
            .connection()
            .query_row(r#"SELECT COUNT(*) FROM "date""#, [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_one_failure_does_not_block_others() {
        let mut store = SqliteStore::in_memory().unwrap();
        let duplicate_ids = Partition {
            table: "umpire".into(),
            id_column: "match_id".into(),
            columns: vec![
                Column::new("match_id", ColumnKind::Text, vec![text("1"), text("1")]),
                Column::new("umpire.1", ColumnKind::Text, vec![text("A"), text("B")]),
            ],
        };

        let report = store.persist(&[duplicate_ids, date_partition()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "umpire");
        assert_eq!(report.written, vec![("date".to_string(), 2)]);

        // The failed transaction left nothing behind
        let exists: i64 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'umpire'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 0);
    }

    #[test]
    fn test_column_types() {
        let mut store = SqliteStore::in_memory().unwrap();
        let partition = Partition {
            table: "matchinfo".into(),
            id_column: "match_id".into(),
            columns: vec![
                Column::new("match_id", ColumnKind::Text, vec![text("1")]),
                Column::new("overs", ColumnKind::Integer, vec![CellValue::Integer(50)]),
                Column::new("rate", ColumnKind::Real, vec![CellValue::Real(4.5)]),
            ],
        };
        assert!(store.persist(&[partition]).is_complete());

        let (overs, rate): (i64, f64) = store
            .connection()
            .query_row("SELECT overs, rate FROM matchinfo", [], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        assert_eq!(overs, 50);
        assert_eq!(rate, 4.5);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("date.1"), "\"date.1\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
