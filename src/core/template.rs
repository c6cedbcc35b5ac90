//! Template rendering - `{{key}}` substitution and dotted path lookup
//!
//! Queue items are rendered with templates such as:
//! ```text
//! {{statusIcon}} #{{id}} {{title}}
//! ```
//! Keys are looked up in a flat JSON object; missing keys render as "".

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^}]+)\s*\}\}").expect("placeholder pattern"))
}

/// Render a template against a flat value mapping
pub fn render(template: &str, values: &Map<String, Value>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            values
                .get(caps[1].trim())
                .map(value_to_string)
                .unwrap_or_default()
        })
        .into_owned()
}

/// String form of a JSON value as it appears in rendered labels
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                // Nulls inside lists render as empty slots
                Value::Null => String::new(),
                other => value_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Resolve a dotted path like `data.items.0.file` inside a JSON value.
///
/// Sequences take numeric segments as indexes, objects take segments as
/// keys. Anything else, or a missing segment, yields `None`.
pub fn get_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}
