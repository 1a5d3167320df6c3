//! Document loading for one batch version
//!
//! Every match document under `interim/<version>/` is parsed into a nested
//! record and split into an *info* record and an *innings* record, both
//! tagged with the document id taken from the file path.

use crate::layout::DataLayout;
use crate::types::{BatchVersion, Document, DocumentKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// `<YYYY-MM-DD>/<digits>.<ext>` at the end of a document path
static DOCUMENT_PATH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})[/\\](\d+)\.[A-Za-z]+$").unwrap()
});

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no extracted documents for version {0}")]
    MissingVersion(BatchVersion),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("cannot extract a document id for version {version} from {}", .path.display())]
    UnrecognizedPath { path: PathBuf, version: BatchVersion },
}

/// Knobs for a loader run
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Stop after this many documents
    pub limit: Option<usize>,
}

/// Both record collections of one batch, in enumeration order
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub info: Vec<Document>,
    pub innings: Vec<Document>,
}

impl Batch {
    pub fn documents(&self, kind: DocumentKind) -> &[Document] {
        match kind {
            DocumentKind::Info => &self.info,
            DocumentKind::Innings => &self.innings,
        }
    }

    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// Document encodings found in the interim directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Yaml,
}

impl Encoding {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Encoding::Json),
            "yaml" | "yml" => Some(Encoding::Yaml),
            _ => None,
        }
    }
}

/// Load every document of `version`.
///
/// The first unreadable or malformed document aborts the whole batch.
pub fn load_batch(
    layout: &DataLayout,
    version: &BatchVersion,
    options: &LoadOptions,
) -> Result<Batch, LoadError> {
    let dir = layout.version_dir(version);
    if !dir.is_dir() {
        return Err(LoadError::MissingVersion(version.clone()));
    }

    let paths = document_paths(&dir)?;
    let total = options.limit.map_or(paths.len(), |limit| limit.min(paths.len()));
    let mut batch = Batch::default();

    for (i, (path, encoding)) in paths.into_iter().take(total).enumerate() {
        let id = document_id(&path, version)?;
        let document = parse_document(&path, encoding)?;

        let (info_record, innings_record) = split_document(document);
        batch.info.push(Document::new(id.clone(), info_record));
        batch.innings.push(Document::new(id, innings_record));

        info!(done = i + 1, total, "loaded {}", path.display());
    }

    Ok(batch)
}

/// Document files directly under `dir`, sorted by file name
fn document_paths(dir: &Path) -> Result<Vec<(PathBuf, Encoding)>, LoadError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        match Encoding::from_path(&path) {
            Some(encoding) => paths.push((path, encoding)),
            None => debug!("skipping non-document file {}", path.display()),
        }
    }

    Ok(paths)
}

/// Extract the numeric id following the version directory in `path`
pub fn document_id(path: &Path, version: &BatchVersion) -> Result<String, LoadError> {
    let unrecognized = || LoadError::UnrecognizedPath {
        path: path.to_path_buf(),
        version: version.clone(),
    };

    let text = path.to_string_lossy();
    let captures = DOCUMENT_PATH_REGEX.captures(&text).ok_or_else(unrecognized)?;
    if &captures[1] != version.as_str() {
        return Err(unrecognized());
    }

    Ok(captures[2].to_string())
}

fn parse_document(path: &Path, encoding: Encoding) -> Result<Value, LoadError> {
    let mut bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |message: String| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match encoding {
        Encoding::Json => simd_json::serde::from_slice::<Value>(&mut bytes)
            .map_err(|e| parse_error(e.to_string())),
        Encoding::Yaml => serde_yaml::from_slice::<serde_yaml::Value>(&bytes)
            .map(yaml_to_json)
            .map_err(|e| parse_error(e.to_string())),
    }
}

/// Convert a YAML tree into a JSON tree.
///
/// YAML allows non-string keys (deliveries are keyed by numbers like `0.1`);
/// they are rendered as text.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(mapping) => {
            let mut obj = Map::new();
            for (key, value) in mapping {
                obj.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::from("null"),
        other => yaml_to_json(other).to_string(),
    }
}

/// Split a match document into its info record and its innings record
pub fn split_document(document: Value) -> (Value, Value) {
    let mut obj = match document {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };

    let info = match obj.remove("info") {
        Some(Value::Object(info)) => Value::Object(info),
        _ => Value::Object(Map::new()),
    };
    let innings = innings_record(obj.remove("innings").unwrap_or(Value::Null));

    (info, innings)
}

/// Key each innings of the `innings` list by its name.
///
/// An element that is a single-key map (`{"1st innings": {..}}`) is keyed by
/// that key; any other element by `innings_<position>`.
fn innings_record(innings: Value) -> Value {
    let elements = match innings {
        Value::Array(elements) => elements,
        Value::Object(obj) => return Value::Object(obj),
        _ => return Value::Object(Map::new()),
    };

    let mut record = Map::new();
    for (i, element) in elements.into_iter().enumerate() {
        match element {
            Value::Object(obj) if obj.len() == 1 => {
                record.extend(obj);
            }
            other => {
                record.insert(format!("innings_{}", i + 1), other);
            }
        }
    }
    Value::Object(record)
}
