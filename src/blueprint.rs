use serde_json::{Map, Value};
use std::rc::Rc;
use tracing::warn;

/// Component types with dedicated node behavior
pub const LIST_TYPE: &str = "list";
pub const LIST_ITEM_TYPE: &str = "listItem";
pub const PAGE_TYPE: &str = "page";

/// Fallback type for specifications without a `type`
pub const UNKNOWN_TYPE: &str = "unknown";

/// Iterator variable used when a list does not declare one
pub const DEFAULT_ITERATOR_VAR: &str = "itemObject";

/// Keys copied into the working property bag without dereferencing. They either hold
/// paths that are meaningful as paths (`dataKey`), list bookkeeping, or action chains that
/// belong to the action executor.
pub const VERBATIM_KEYS: &[&str] = &[
    "dataKey",
    "iteratorVar",
    "listId",
    "viewTag",
    "onClick",
    "onChange",
    "onBlur",
    "onFocus",
    "onInput",
    "onHover",
    "onSubmit",
    "onTextChange",
];

/// Keys handled by the tree builder rather than the property bag
pub const STRUCTURAL_KEYS: &[&str] = &["type", "id", "style", "children", "listObject"];

/// The declarative specification a node was built from.
///
/// Cloning is cheap; all clones share the same immutable value.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint(Rc<Value>);

impl Blueprint {
    pub fn new(spec: Value) -> Self {
        let spec = match spec {
            Value::Object(_) => spec,
            other => {
                warn!("Component specification is not an object: {}", other);
                Value::Object(Map::new())
            }
        };
        Blueprint(Rc::new(spec))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The component type, or [`UNKNOWN_TYPE`] when missing
    pub fn component_type(&self) -> &str {
        self.get_str("type").unwrap_or(UNKNOWN_TYPE)
    }

    pub fn has_type(&self) -> bool {
        self.get_str("type").is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id").filter(|id| !id.is_empty())
    }

    pub fn style(&self) -> Option<&Map<String, Value>> {
        self.get("style").and_then(Value::as_object)
    }

    /// Declared children. A single object counts as one child; anything else that is not
    /// an array of objects is skipped with a diagnostic.
    pub fn children(&self) -> Vec<&Value> {
        match self.get("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(child @ Value::Object(_)) => vec![child],
            Some(Value::Array(items)) => items
                .iter()
                .filter(|item| {
                    let ok = item.is_object();
                    if !ok {
                        warn!(
                            "Skipping non-object child of '{}': {}",
                            self.component_type(),
                            item
                        );
                    }
                    ok
                })
                .collect(),
            Some(other) => {
                warn!(
                    "Ignoring malformed children of '{}': {}",
                    self.component_type(),
                    other
                );
                Vec::new()
            }
        }
    }

    pub fn iterator_var(&self) -> &str {
        self.get_str("iteratorVar")
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_ITERATOR_VAR)
    }
}

/// Derive the template every row of a list is built from: the first declared child,
/// deep-cloned and tagged with the list's id and iterator variable on every node.
pub fn row_blueprint(list: &Blueprint, list_id: &str, iterator_var: &str) -> Value {
    let mut row = match list.children().first() {
        Some(first) => (*first).clone(),
        None => {
            warn!("List '{}' has no row blueprint, rows will be empty", list_id);
            let mut empty = Map::new();
            empty.insert("type".to_string(), Value::String(LIST_ITEM_TYPE.to_string()));
            Value::Object(empty)
        }
    };
    tag_list_scope(&mut row, list_id, iterator_var);
    row
}

/// Stamp `listId` / `iteratorVar` onto a specification and all of its descendants.
/// A nested list keeps its own binding and tags its rows itself.
pub fn tag_list_scope(spec: &mut Value, list_id: &str, iterator_var: &str) {
    let Value::Object(map) = spec else {
        return;
    };
    map.insert("listId".to_string(), Value::String(list_id.to_string()));
    map.insert(
        "iteratorVar".to_string(),
        Value::String(iterator_var.to_string()),
    );
    match map.get_mut("children") {
        Some(Value::Array(children)) => {
            for child in children {
                if !is_list(child) {
                    tag_list_scope(child, list_id, iterator_var);
                }
            }
        }
        Some(child @ Value::Object(_)) => {
            if !is_list(child) {
                tag_list_scope(child, list_id, iterator_var);
            }
        }
        _ => {}
    }
}

fn is_list(spec: &Value) -> bool {
    spec.get("type").and_then(Value::as_str) == Some(LIST_TYPE)
}
