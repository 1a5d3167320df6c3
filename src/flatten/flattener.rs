use crate::flatten::codec::list_elements;
use crate::flatten::schema::{FieldKind, FieldSchema};
use crate::flatten::table::{CellValue, Column, ColumnKind, FlatTable, SEPARATOR};
use crate::types::{Document, DocumentKind};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("id column {0:?} must be non-empty and must not contain a dot")]
    InvalidIdColumn(String),

    #[error("column {0:?} is produced both by a list field and by a nested field")]
    DuplicateColumn(String),
}

/// Configuration for the flattening process
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Name of the join column holding the document id
    pub id_column: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        FlattenConfig {
            id_column: String::from("match_id"),
        }
    }
}

/// A leaf value before its column type is known
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Integer(i64),
    Real(f64),
    Bool(bool),
    Text(String),
}

impl RawCell {
    fn from_leaf(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(RawCell::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(RawCell::Integer(i)),
                None => n.as_f64().map(RawCell::Real),
            },
            Value::String(s) => Some(RawCell::Text(s.clone())),
            // Undeclared lists and other structure end up as their JSON text
            other => Some(RawCell::Text(other.to_string())),
        }
    }

    fn into_text(self) -> String {
        match self {
            RawCell::Integer(i) => i.to_string(),
            RawCell::Real(r) => r.to_string(),
            RawCell::Bool(b) => b.to_string(),
            RawCell::Text(s) => s,
        }
    }
}

/// A group of output columns, in discovery order
#[derive(Debug)]
enum Slot {
    Field(String),
    List { basename: String, max_len: usize },
}

/// One document after recursive flattening, before schema unification
#[derive(Debug, Default)]
struct FlatDocument {
    fields: HashMap<String, RawCell>,
    lists: HashMap<String, Vec<Option<String>>>,
}

/// Accumulates the column set of a batch as documents are flattened
#[derive(Debug, Default)]
struct ColumnSet {
    slots: Vec<Slot>,
    fields: HashMap<String, usize>,
    lists: HashMap<String, usize>,
}

impl ColumnSet {
    fn see_field(&mut self, name: &str) {
        if !self.fields.contains_key(name) {
            self.fields.insert(name.to_string(), self.slots.len());
            self.slots.push(Slot::Field(name.to_string()));
        }
    }

    fn see_list(&mut self, basename: &str, len: usize) {
        match self.lists.get(basename) {
            Some(&idx) => {
                if let Slot::List { max_len, .. } = &mut self.slots[idx] {
                    *max_len = (*max_len).max(len);
                }
            }
            None => {
                self.lists.insert(basename.to_string(), self.slots.len());
                self.slots.push(Slot::List {
                    basename: basename.to_string(),
                    max_len: len,
                });
            }
        }
    }
}

/// Flattens nested records of one document kind into a [`FlatTable`]
pub struct Flattener {
    schema: &'static FieldSchema,
    config: FlattenConfig,
}

impl Flattener {
    pub fn new(schema: &'static FieldSchema, config: FlattenConfig) -> Self {
        Flattener { schema, config }
    }

    pub fn for_kind(kind: DocumentKind, config: FlattenConfig) -> Self {
        Flattener::new(FieldSchema::for_kind(kind), config)
    }

    /// Flatten a whole batch: one row per document, ids in the first column
    pub fn flatten(&self, documents: &[Document]) -> Result<FlatTable, FlattenError> {
        let id_column = &self.config.id_column;
        if id_column.is_empty() || id_column.contains(SEPARATOR) {
            return Err(FlattenError::InvalidIdColumn(id_column.clone()));
        }

        let mut column_set = ColumnSet::default();
        let mut flat_documents = Vec::with_capacity(documents.len());

        for document in documents {
            let flat = self.flatten_document(&document.record);

            self.discover(&document.record, "", &flat, &mut column_set);
            flat_documents.push(flat);
        }

        let mut columns = Vec::new();
        columns.push(Column::new(
            id_column.clone(),
            ColumnKind::Text,
            documents
                .iter()
                .map(|d| CellValue::Text(d.id.0.clone()))
                .collect(),
        ));

        for slot in &column_set.slots {
            match slot {
                Slot::Field(name) if name == id_column => {
                    debug!(column = %name, "record field shadows the id column; dropped");
                }
                Slot::Field(name) => {
                    let raw: Vec<Option<RawCell>> = flat_documents
                        .iter_mut()
                        .map(|doc| doc.fields.remove(name))
                        .collect();
                    columns.push(unify_column(name.clone(), raw));
                }
                Slot::List { basename, max_len } => {
                    for position in 0..*max_len {
                        let values = flat_documents
                            .iter_mut()
                            .map(|doc| {
                                doc.lists
                                    .get_mut(basename)
                                    .and_then(|elements| elements.get_mut(position))
                                    .and_then(Option::take)
                                    .map_or(CellValue::Null, CellValue::Text)
                            })
                            .collect();
                        columns.push(Column::new(
                            format!("{}{}{}", basename, SEPARATOR, position + 1),
                            ColumnKind::Text,
                            values,
                        ));
                    }
                }
            }
        }

        let mut names = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(FlattenError::DuplicateColumn(column.name.clone()));
            }
        }

        debug!(
            kind = %self.schema.kind,
            rows = documents.len(),
            columns = columns.len(),
            "flattened batch"
        );

        Ok(FlatTable {
            id_column: id_column.clone(),
            columns,
        })
    }

    /// Flatten one record into leaf cells and expanded list fields
    fn flatten_document(&self, record: &Value) -> FlatDocument {
        let mut flat = FlatDocument::default();
        match record {
            Value::Object(obj) => self.flatten_object(obj, "", &mut flat),
            Value::Null => {}
            other => {
                // A bare scalar record has no field names to hang columns on
                debug!(record = %other, "record is not a map; no columns");
            }
        }
        flat
    }

    fn flatten_object(&self, obj: &Map<String, Value>, prefix: &str, flat: &mut FlatDocument) {
        for (key, value) in sorted_entries(obj) {
            let path = join_path(prefix, key);
            match self.schema.field_kind(&path) {
                FieldKind::List { basename, codec } => {
                    let elements = list_elements(&path, value)
                        .into_iter()
                        .map(|element| codec.encode(element))
                        .collect();
                    flat.lists.insert(basename.to_string(), elements);
                }
                FieldKind::Scalar => match value {
                    Value::Object(nested) => self.flatten_object(nested, &path, flat),
                    leaf => {
                        if let Some(cell) = RawCell::from_leaf(leaf) {
                            flat.fields.insert(path, cell);
                        }
                    }
                },
            }
        }
    }

    /// Register the columns `record` contributes, in key order.
    ///
    /// Null leaves still name a column.
    fn discover(&self, record: &Value, prefix: &str, flat: &FlatDocument, columns: &mut ColumnSet) {
        let Value::Object(obj) = record else {
            return;
        };
        for (key, value) in sorted_entries(obj) {
            let path = join_path(prefix, key);
            match self.schema.field_kind(&path) {
                FieldKind::List { basename, .. } => {
                    let len = flat.lists.get(basename).map_or(0, Vec::len);
                    columns.see_list(basename, len);
                }
                FieldKind::Scalar => match value {
                    Value::Object(_) => self.discover(value, &path, flat, columns),
                    _ => columns.see_field(&path),
                },
            }
        }
    }
}

/// Map entries by key, independent of how the map stores them
fn sorted_entries(obj: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = obj.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", prefix, SEPARATOR, key)
    }
}

/// Give a column a single type: integer or real when every non-null value is
/// numeric, text otherwise.
fn unify_column(name: String, raw: Vec<Option<RawCell>>) -> Column {
    let present = || raw.iter().flatten();

    let kind = if present().next().is_none() {
        ColumnKind::Text
    } else if present().all(|c| matches!(c, RawCell::Integer(_))) {
        ColumnKind::Integer
    } else if present().all(|c| matches!(c, RawCell::Integer(_) | RawCell::Real(_))) {
        ColumnKind::Real
    } else {
        ColumnKind::Text
    };

    let values = raw
        .into_iter()
        .map(|cell| match (kind, cell) {
            (_, None) => CellValue::Null,
            (ColumnKind::Integer, Some(RawCell::Integer(i))) => CellValue::Integer(i),
            (ColumnKind::Real, Some(RawCell::Integer(i))) => CellValue::Real(i as f64),
            (ColumnKind::Real, Some(RawCell::Real(r))) => CellValue::Real(r),
            (_, Some(other)) => CellValue::Text(other.into_text()),
        })
        .collect();

    Column::new(name, kind, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::schema::INFO_SCHEMA;
    use serde_json::json;

    fn info_flattener() -> Flattener {
        Flattener::new(&INFO_SCHEMA, FlattenConfig::default())
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_nested_maps_become_dotted_columns() {
        let docs = vec![Document::new(
            "1",
            json!({
                "city": "Mumbai",
                "overs": 50,
                "outcome": {"winner": "India", "by": {"runs": 36}}
            }),
        )];

        let table = info_flattener().flatten(&docs).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["match_id", "city", "outcome.by.runs", "outcome.winner", "overs"]
        );
        assert_eq!(table.cell("1", "outcome.by.runs"), Some(&CellValue::Integer(36)));
        assert_eq!(table.column("overs").unwrap().kind, ColumnKind::Integer);
    }

    #[test]
    fn test_dates_scenario() {
        let docs = vec![
            Document::new("1", json!({"dates": [[2020, 1, 5]]})),
            Document::new("2", json!({"dates": [[2020, 3, 15], [2020, 3, 16]]})),
            Document::new("3", json!({"dates": []})),
        ];

        let table = info_flattener().flatten(&docs).unwrap();
        assert_eq!(table.column_names(), vec!["match_id", "date.1", "date.2"]);

        assert_eq!(table.cell("1", "date.1"), Some(&text("2020-01-05")));
        assert_eq!(table.cell("1", "date.2"), Some(&CellValue::Null));
        assert_eq!(table.cell("2", "date.1"), Some(&text("2020-03-15")));
        assert_eq!(table.cell("2", "date.2"), Some(&text("2020-03-16")));
        assert_eq!(table.cell("3", "date.1"), Some(&CellValue::Null));
        assert_eq!(table.cell("3", "date.2"), Some(&CellValue::Null));
    }

    #[test]
    fn test_teams_are_not_padded() {
        let docs = vec![Document::new("7", json!({"teams": ["India", "Australia"]}))];

        let table = info_flattener().flatten(&docs).unwrap();
        assert_eq!(table.cell("7", "team.1"), Some(&text("India")));
        assert_eq!(table.cell("7", "team.2"), Some(&text("Australia")));
    }

    #[test]
    fn test_every_row_has_max_list_length_columns() {
        let docs = vec![
            Document::new("1", json!({"umpires": ["A", "B"]})),
            Document::new("2", json!({"umpires": ["C", "D", "E"]})),
            Document::new("3", json!({"umpires": ["F"]})),
        ];

        let table = info_flattener().flatten(&docs).unwrap();
        let umpire_columns: Vec<_> = table
            .column_names()
            .into_iter()
            .filter(|name| name.starts_with("umpire."))
            .collect();
        assert_eq!(umpire_columns, vec!["umpire.1", "umpire.2", "umpire.3"]);
        for column in &table.columns {
            assert_eq!(column.values.len(), 3);
        }
        assert_eq!(table.cell("3", "umpire.2"), Some(&CellValue::Null));
    }

    #[test]
    fn test_missing_list_field_is_null() {
        let docs = vec![
            Document::new("1", json!({"city": "Pune", "umpires": ["A", "B"]})),
            Document::new("2", json!({"city": "Perth"})),
        ];

        let table = info_flattener().flatten(&docs).unwrap();
        assert_eq!(table.cell("2", "umpire.1"), Some(&CellValue::Null));
        assert_eq!(table.cell("2", "umpire.2"), Some(&CellValue::Null));
    }

    #[test]
    fn test_mixed_columns_become_text() {
        let docs = vec![
            Document::new("1", json!({"overs": 50, "match_type_number": 1.5, "result": "tie"})),
            Document::new("2", json!({"overs": "20 overs", "match_type_number": 2, "result": {"a": 1}})),
            Document::new("3", json!({"overs": null, "supersubs": ["X"]})),
        ];

        let table = info_flattener().flatten(&docs).unwrap();

        let overs = table.column("overs").unwrap();
        assert_eq!(overs.kind, ColumnKind::Text);
        assert_eq!(overs.values, vec![text("50"), text("20 overs"), CellValue::Null]);

        let number = table.column("match_type_number").unwrap();
        assert_eq!(number.kind, ColumnKind::Real);
        assert_eq!(number.values[1], CellValue::Real(2.0));

        // A scalar in one document and a map in another: both columns exist
        assert_eq!(table.cell("1", "result"), Some(&text("tie")));
        assert_eq!(table.cell("2", "result.a"), Some(&CellValue::Integer(1)));

        // Undeclared lists are kept as their JSON text
        assert_eq!(table.cell("3", "supersubs"), Some(&text(r#"["X"]"#)));
    }

    #[test]
    fn test_column_order_is_deterministic() {
        let docs = vec![
            Document::new("1", json!({"venue": "MCG", "teams": ["A", "B"], "city": "Melbourne"})),
            Document::new("2", json!({"toss": {"winner": "B", "decision": "bat"}, "dates": ["2020-1-1"]})),
        ];

        let first = info_flattener().flatten(&docs).unwrap();
        let second = info_flattener().flatten(&docs).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.column_names(),
            vec![
                "match_id",
                "city",
                "team.1",
                "team.2",
                "venue",
                "date.1",
                "toss.decision",
                "toss.winner"
            ]
        );
    }

    #[test]
    fn test_scalar_in_list_field_is_one_element() {
        let docs = vec![Document::new("1", json!({"player_of_match": "SR Tendulkar"}))];

        let table = info_flattener().flatten(&docs).unwrap();
        assert_eq!(table.cell("1", "player_of_match.1"), Some(&text("SR Tendulkar")));
    }

    #[test]
    fn test_empty_batch() {
        let table = info_flattener().flatten(&[]).unwrap();
        assert_eq!(table.height(), 0);
        assert_eq!(table.column_names(), vec!["match_id"]);
    }

    #[test]
    fn test_invalid_id_column() {
        let flattener = Flattener::new(
            &INFO_SCHEMA,
            FlattenConfig { id_column: "match.id".to_string() },
        );
        assert!(matches!(
            flattener.flatten(&[]),
            Err(FlattenError::InvalidIdColumn(_))
        ));
    }

    #[test]
    fn test_list_and_nested_field_with_same_column_name() {
        let docs = vec![Document::new(
            "1",
            json!({
                "teams": ["India", "Australia"],
                "team": {"1": "India A"}
            }),
        )];

        let result = info_flattener().flatten(&docs);
        assert!(matches!(result, Err(FlattenError::DuplicateColumn(name)) if name == "team.1"));
    }
}
