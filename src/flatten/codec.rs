//! Element codecs for declared list fields

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

static LOOSE_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap()
});

/// How one element of a list field is re-encoded into a column value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCodec {
    /// `YYYY-MM-DD` with zero-padded month and day
    Date,
    /// The literal element, without any quoting
    Text,
}

impl ElementCodec {
    /// Encode one element; a null element stays null
    pub fn encode(self, element: &Value) -> Option<String> {
        if element.is_null() {
            return None;
        }
        match self {
            ElementCodec::Date => Some(encode_date(element)),
            ElementCodec::Text => Some(encode_text(element)),
        }
    }
}

/// Split a declared list field's value into its elements.
///
/// A scalar is a one-element list. A map cannot be read as a list and yields
/// no elements.
pub fn list_elements<'a>(path: &str, value: &'a Value) -> Vec<&'a Value> {
    match value {
        Value::Array(elements) => elements.iter().collect(),
        Value::Null => Vec::new(),
        Value::Object(_) => {
            warn!(field = path, "expected a list, found a map; treating as empty");
            Vec::new()
        }
        scalar => vec![scalar],
    }
}

fn encode_text(element: &Value) -> String {
    match element {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encode_date(element: &Value) -> String {
    let parts = match element {
        Value::String(s) => LOOSE_DATE_REGEX.captures(s).and_then(|caps| {
            Some((
                caps[1].parse::<u32>().ok()?,
                caps[2].parse::<u32>().ok()?,
                caps[3].parse::<u32>().ok()?,
            ))
        }),
        Value::Array(items) if items.len() == 3 => {
            match (items[0].as_u64(), items[1].as_u64(), items[2].as_u64()) {
                (Some(y), Some(m), Some(d)) => Some((y as u32, m as u32, d as u32)),
                _ => None,
            }
        }
        _ => None,
    };

    match parts {
        Some((year, month, day)) => format!("{:04}-{:02}-{:02}", year, month, day),
        None => {
            warn!(element = %element, "unrecognized date element; keeping it as text");
            encode_text(element)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_date_padding() {
        assert_eq!(ElementCodec::Date.encode(&json!([2020, 1, 5])).unwrap(), "2020-01-05");
        assert_eq!(ElementCodec::Date.encode(&json!("2020-3-15")).unwrap(), "2020-03-15");
        assert_eq!(ElementCodec::Date.encode(&json!("2020-03-16")).unwrap(), "2020-03-16");
    }

    #[test]
    fn test_unrecognized_date_is_kept() {
        assert_eq!(ElementCodec::Date.encode(&json!("sometime in May")).unwrap(), "sometime in May");
        assert_eq!(ElementCodec::Date.encode(&json!([2020, 1])).unwrap(), "[2020,1]");
    }

    #[test]
    fn test_text_is_not_padded() {
        assert_eq!(ElementCodec::Text.encode(&json!("India")).unwrap(), "India");
        assert_eq!(ElementCodec::Text.encode(&json!("2020-1-5")).unwrap(), "2020-1-5");
        assert_eq!(ElementCodec::Text.encode(&json!(7)).unwrap(), "7");
        assert_eq!(ElementCodec::Text.encode(&Value::Null), None);
    }

    #[test]
    fn test_list_elements() {
        let teams = json!(["India", "Australia"]);
        assert_eq!(list_elements("teams", &teams).len(), 2);

        let single = json!("India");
        assert_eq!(list_elements("teams", &single), vec![&single]);

        assert!(list_elements("teams", &Value::Null).is_empty());
        assert!(list_elements("teams", &json!({"a": 1})).is_empty());
    }
}
