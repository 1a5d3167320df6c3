//! Static field schemas for each document kind
//!
//! The corpus has a fixed family of shapes, so which fields hold lists is
//! declared here rather than inferred from the data.

use crate::flatten::codec::ElementCodec;
use crate::types::DocumentKind;

/// How a field is turned into columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Maps recurse, leaves become one column
    Scalar,
    /// Expanded into `basename.1 .. basename.N`
    List {
        basename: &'static str,
        codec: ElementCodec,
    },
}

/// A declared list field and the basename of its per-element columns
#[derive(Debug, Clone, Copy)]
pub struct ListField {
    /// Dotted path of the field in the record
    pub path: &'static str,
    pub basename: &'static str,
    pub codec: ElementCodec,
}

impl ListField {
    pub const fn new(path: &'static str, basename: &'static str, codec: ElementCodec) -> Self {
        ListField { path, basename, codec }
    }
}

/// The fields of one document kind that need special handling
#[derive(Debug)]
pub struct FieldSchema {
    pub kind: DocumentKind,
    pub list_fields: &'static [ListField],
}

impl FieldSchema {
    pub fn for_kind(kind: DocumentKind) -> &'static FieldSchema {
        match kind {
            DocumentKind::Info => &INFO_SCHEMA,
            DocumentKind::Innings => &INNINGS_SCHEMA,
        }
    }

    /// Look up how the field at `path` is flattened
    pub fn field_kind(&self, path: &str) -> FieldKind {
        self.list_fields
            .iter()
            .find(|field| field.path == path)
            .map_or(FieldKind::Scalar, |field| FieldKind::List {
                basename: field.basename,
                codec: field.codec,
            })
    }
}

pub static INFO_SCHEMA: FieldSchema = FieldSchema {
    kind: DocumentKind::Info,
    list_fields: &[
        ListField::new("dates", "date", ElementCodec::Date),
        ListField::new("player_of_match", "player_of_match", ElementCodec::Text),
        ListField::new("teams", "team", ElementCodec::Text),
        ListField::new("umpires", "umpire", ElementCodec::Text),
    ],
};

pub static INNINGS_SCHEMA: FieldSchema = FieldSchema {
    kind: DocumentKind::Innings,
    list_fields: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_list_fields() {
        let schema = FieldSchema::for_kind(DocumentKind::Info);

        assert_eq!(
            schema.field_kind("dates"),
            FieldKind::List { basename: "date", codec: ElementCodec::Date }
        );
        assert_eq!(
            schema.field_kind("umpires"),
            FieldKind::List { basename: "umpire", codec: ElementCodec::Text }
        );
        assert_eq!(schema.field_kind("city"), FieldKind::Scalar);
        // Only the declared path is a list, not a nested field of the same name
        assert_eq!(schema.field_kind("outcome.teams"), FieldKind::Scalar);
    }

    #[test]
    fn test_player_of_match_keeps_its_name() {
        let schema = FieldSchema::for_kind(DocumentKind::Info);
        assert!(matches!(
            schema.field_kind("player_of_match"),
            FieldKind::List { basename: "player_of_match", .. }
        ));
    }

    #[test]
    fn test_innings_has_no_list_fields() {
        let schema = FieldSchema::for_kind(DocumentKind::Innings);
        assert!(schema.list_fields.is_empty());
        assert_eq!(schema.field_kind("1st innings.team"), FieldKind::Scalar);
    }
}
