//! Conversion from raw ConfigMap data into a value tree.
//!
//! Fields whose text starts with [`DOCUMENT_MARKER`] are parsed as YAML
//! with `serde-saphyr`. Anything that fails to parse into a mapping is kept
//! verbatim as a string leaf; no field-level error is raised.

use std::collections::BTreeMap;

use serde_saphyr::Options;
use tracing::debug;

use super::{Mapping, Value};

/// Line that marks a field's text as a structured YAML document.
pub const DOCUMENT_MARKER: &str = "---\n";

/// Build the root of a value tree from a ConfigMap's `data` section.
///
/// The result is always a [`Value::Map`] whose entries are either string
/// leaves or nested mappings.
#[must_use]
pub fn parse_data(data: &BTreeMap<String, String>) -> Value {
    let root: Mapping = data
        .iter()
        .map(|(name, text)| (name.clone(), parse_field(name, text)))
        .collect();
    Value::Map(root)
}

/// Parse one field, degrading to a string leaf when the text is not a
/// structured mapping.
#[must_use]
pub fn parse_field(name: &str, text: &str) -> Value {
    let Some(document) = text.strip_prefix(DOCUMENT_MARKER) else {
        return Value::String(text.to_owned());
    };
    if document.is_empty() {
        return Value::String(text.to_owned());
    }
    match parse_document(document) {
        Ok(Some(map)) => Value::Map(map),
        Ok(None) => {
            debug!(field = name, "structured field is not a mapping; keeping text");
            Value::String(text.to_owned())
        }
        Err(err) => {
            debug!(field = name, error = %err, "structured field failed to parse; keeping text");
            Value::String(text.to_owned())
        }
    }
}

/// Parse a YAML document, returning `None` when it is not a mapping.
///
/// A document holding only whitespace, comments or an explicit null reads
/// as an empty mapping.
fn parse_document(document: &str) -> Result<Option<Mapping>, serde_saphyr::Error> {
    if is_blank_document(document) {
        return Ok(Some(Mapping::new()));
    }
    let parsed: serde_json::Value = serde_saphyr::from_str_with_options(
        document,
        Options {
            strict_booleans: true,
            ..Options::default()
        },
    )?;
    Ok(match Value::from(parsed) {
        Value::Map(map) => Some(map),
        Value::Null => Some(Mapping::new()),
        _ => None,
    })
}

fn is_blank_document(document: &str) -> bool {
    document
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}
