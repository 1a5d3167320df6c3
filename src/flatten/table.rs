use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the path segments of a column name
pub const SEPARATOR: char = '.';

/// One cell of a flat table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("null"),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// The single type shared by every value of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Text before the first separator, or `None` for an undotted name
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(SEPARATOR).map(|(prefix, _)| prefix)
    }
}

/// A batch of flattened documents stored column by column.
///
/// The id column is always the first column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatTable {
    pub id_column: String,
    pub columns: Vec<Column>,
}

impl FlatTable {
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn id_values(&self) -> &[CellValue] {
        self.column(&self.id_column)
            .map(|c| c.values.as_slice())
            .unwrap_or(&[])
    }

    /// Row index of the document with `id`
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.id_values().iter().position(|v| v.as_str() == Some(id))
    }

    /// The cell of column `name` for the document with `id`
    pub fn cell(&self, id: &str, name: &str) -> Option<&CellValue> {
        let row = self.row_of(id)?;
        self.column(name)?.values.get(row)
    }
}
