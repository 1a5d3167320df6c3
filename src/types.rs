use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap()
});

/// Identifier of one match document, unique within a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A date-keyed snapshot of the corpus, e.g. `2020-03-16`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchVersion(String);

#[derive(Debug, thiserror::Error)]
#[error("batch version must look like YYYY-MM-DD, got {0:?}")]
pub struct InvalidVersion(pub String);

impl BatchVersion {
    /// The version key for a snapshot taken today (local time)
    pub fn today() -> Self {
        BatchVersion(chrono::Local::now().format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BatchVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if VERSION_REGEX.is_match(s) {
            Ok(BatchVersion(s.to_string()))
        } else {
            Err(InvalidVersion(s.to_string()))
        }
    }
}

impl fmt::Display for BatchVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two schema families found in a match document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Info,
    Innings,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Info, DocumentKind::Innings];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Info => "info",
            DocumentKind::Innings => "innings",
        }
    }

    /// Name of the relation holding the undotted columns of this kind
    pub fn primary_table(self) -> &'static str {
        match self {
            DocumentKind::Info => "matchinfo",
            DocumentKind::Innings => "innings",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One nested record tagged with the id of the document it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub record: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, record: Value) -> Self {
        Document {
            id: DocumentId::new(id),
            record,
        }
    }
}
