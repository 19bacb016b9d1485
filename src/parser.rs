use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{NoodlError, NoodlResult};

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn parse_mapping(yaml: &str, what: &str) -> NoodlResult<Map<String, Value>> {
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Object(map) => Ok(map),
        other => Err(NoodlError::InvalidBlueprint {
            reason: format!("{} must be a mapping, found {}", what, value_kind(&other)),
        }),
    }
}

// ─── Public parse functions ──────────────────────────────────────────────────

/// Parse a single component specification.
pub fn parse_component(yaml: &str) -> NoodlResult<Value> {
    let component = parse_mapping(yaml, "a component")?;
    if !component.contains_key("type") {
        warn!("Parsed component has no type");
    }
    Ok(Value::Object(component))
}

/// Parse a single component specification given as JSON text.
pub fn parse_component_json(json: &str) -> NoodlResult<Value> {
    match serde_json::from_str::<Value>(json)? {
        component @ Value::Object(_) => Ok(component),
        other => Err(NoodlError::InvalidBlueprint {
            reason: format!("a component must be a mapping, found {}", value_kind(&other)),
        }),
    }
}

/// Parse a page object. Its `components`, when present, must be a sequence.
pub fn parse_page(yaml: &str) -> NoodlResult<Map<String, Value>> {
    let page = parse_mapping(yaml, "a page")?;
    match page.get("components") {
        None | Some(Value::Array(_)) => Ok(page),
        Some(other) => Err(NoodlError::DeserializationError(format!(
            "page components must be a sequence, found {}",
            value_kind(other)
        ))),
    }
}

/// Parse a root object (page name → page object).
pub fn parse_root(yaml: &str) -> NoodlResult<Map<String, Value>> {
    let root = parse_mapping(yaml, "the root object")?;
    for (name, page) in &root {
        if let Some(components) = page.get("components").filter(|c| !c.is_array()) {
            return Err(NoodlError::DeserializationError(format!(
                "components of page '{}' must be a sequence, found {}",
                name,
                value_kind(components)
            )));
        }
    }
    Ok(root)
}
