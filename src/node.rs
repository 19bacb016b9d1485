//! Component nodes.
//!
//! A node owns its immutable [`Blueprint`] and a separate working property bag that
//! receives resolved values and derived `data-*` attributes. Behavior that differs between
//! generic components, lists, list rows and embedded pages lives in [`NodeKind`].

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::blueprint::{Blueprint, STRUCTURAL_KEYS};
use crate::emitter::{Emitter, ListenerId};
use crate::page::PageId;

/// A list data object shared between a list's `listObject` and the row bound to it.
/// Identity comparisons use [`Rc::ptr_eq`].
pub type DataRef = Rc<RefCell<Value>>;

pub fn data_ref(value: Value) -> DataRef {
    Rc::new(RefCell::new(value))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        ComponentId(id.into())
    }

    pub fn generate() -> Self {
        ComponentId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        ComponentId::new(id)
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        ComponentId(id)
    }
}

/// `listId` / `iteratorVar` inherited by everything created under a list row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListScope {
    pub list_id: ComponentId,
    pub iterator_var: String,
}

/// Lifecycle events a node can publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEvent {
    Resolved,
    AddChild,
    RemoveChild,
    AddDataObject,
    RetrieveDataObject,
    DeleteDataObject,
    UpdateDataObject,
    CreateListItem,
    RemoveListItem,
    UpdateListItem,
}

impl NodeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeEvent::Resolved => "resolved",
            NodeEvent::AddChild => "add-child",
            NodeEvent::RemoveChild => "remove-child",
            NodeEvent::AddDataObject => "add-data-object",
            NodeEvent::RetrieveDataObject => "retrieve-data-object",
            NodeEvent::DeleteDataObject => "delete-data-object",
            NodeEvent::UpdateDataObject => "update-data-object",
            NodeEvent::CreateListItem => "create-list-item",
            NodeEvent::RemoveListItem => "remove-list-item",
            NodeEvent::UpdateListItem => "update-list-item",
        }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node event carries to its listeners
#[derive(Debug, Clone)]
pub struct NodeEventPayload {
    /// The node that emitted the event
    pub node: ComponentId,
    pub index: Option<usize>,
    pub data_object: Option<DataRef>,
    /// Child or list row the event is about
    pub child: Option<ComponentId>,
}

impl NodeEventPayload {
    pub fn new(node: ComponentId) -> Self {
        Self {
            node,
            index: None,
            data_object: None,
            child: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_data(mut self, data_object: DataRef) -> Self {
        self.data_object = Some(data_object);
        self
    }

    pub fn with_child(mut self, child: ComponentId) -> Self {
        self.child = Some(child);
        self
    }
}

/// First-class properties a node kind exposes ahead of its property bag
pub trait KindProperties {
    fn get_property(&self, key: &str) -> Option<Value>;

    /// Handle a write. Returns false when the key belongs in the ordinary property bag.
    fn set_property(&mut self, _key: &str, _value: &Value) -> bool {
        false
    }
}

/// The array a list's `listObject` reference pointed at. List operations are written
/// back there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    /// `root[page]` at `path`
    Page { page: String, path: Vec<String> },
    /// The data object of an enclosing list row at `path`
    Row { row: ComponentId, path: Vec<String> },
}

/// Data owned by a list node
#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub iterator_var: String,
    /// `None` until the list's `listObject` has been resolved to an array
    pub list_object: Option<Vec<DataRef>>,
    pub row_blueprint: Option<Value>,
    pub source: Option<ListSource>,
}

impl ListState {
    pub fn new(iterator_var: impl Into<String>) -> Self {
        Self {
            iterator_var: iterator_var.into(),
            list_object: None,
            row_blueprint: None,
            source: None,
        }
    }

    pub fn len(&self) -> usize {
        self.list_object.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the backing array
    pub fn list_object_value(&self) -> Option<Value> {
        self.list_object.as_ref().map(|items| {
            Value::Array(items.iter().map(|item| item.borrow().clone()).collect())
        })
    }
}

impl KindProperties for ListState {
    fn get_property(&self, key: &str) -> Option<Value> {
        match key {
            "iteratorVar" => Some(Value::String(self.iterator_var.clone())),
            "listObject" => self.list_object_value(),
            _ => None,
        }
    }
}

/// Data owned by a list row
#[derive(Debug, Clone)]
pub struct RowState {
    pub list_id: ComponentId,
    pub list_index: usize,
    pub iterator_var: String,
    pub data_object: DataRef,
}

impl KindProperties for RowState {
    fn get_property(&self, key: &str) -> Option<Value> {
        match key {
            "listId" => Some(Value::String(self.list_id.to_string())),
            "listIndex" => Some(Value::from(self.list_index)),
            "iteratorVar" => Some(Value::String(self.iterator_var.clone())),
            "dataObject" => Some(self.data_object.borrow().clone()),
            _ => None,
        }
    }

    fn set_property(&mut self, key: &str, value: &Value) -> bool {
        if key != "dataObject" {
            return false;
        }
        *self.data_object.borrow_mut() = value.clone();
        true
    }
}

/// A `page` component embedding another page's data scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScope {
    pub page_name: String,
}

impl KindProperties for PageScope {
    fn get_property(&self, key: &str) -> Option<Value> {
        match key {
            "path" | "pageName" => Some(Value::String(self.page_name.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Generic,
    List(ListState),
    ListRow(RowState),
    Page(PageScope),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Generic => "generic",
            NodeKind::List(_) => "list",
            NodeKind::ListRow(_) => "listItem",
            NodeKind::Page(_) => "page",
        }
    }

    fn properties(&self) -> Option<&dyn KindProperties> {
        match self {
            NodeKind::Generic => None,
            NodeKind::List(state) => Some(state),
            NodeKind::ListRow(state) => Some(state),
            NodeKind::Page(scope) => Some(scope),
        }
    }

    fn properties_mut(&mut self) -> Option<&mut dyn KindProperties> {
        match self {
            NodeKind::Generic => None,
            NodeKind::List(state) => Some(state),
            NodeKind::ListRow(state) => Some(state),
            NodeKind::Page(scope) => Some(scope),
        }
    }
}

/// One live component
#[derive(Debug)]
pub struct ComponentNode {
    id: ComponentId,
    pub(crate) kind: NodeKind,
    blueprint: Blueprint,
    pub(crate) props: Map<String, Value>,
    pub(crate) style: Map<String, Value>,
    pub(crate) children: Vec<ComponentId>,
    parent: Option<ComponentId>,
    list_scope: Option<ListScope>,
    page_id: PageId,
    root_key: String,
    pub(crate) events: Emitter<NodeEvent, NodeEventPayload>,
}

impl ComponentNode {
    pub fn new(
        id: ComponentId,
        kind: NodeKind,
        blueprint: Blueprint,
        parent: Option<ComponentId>,
        page_id: PageId,
        root_key: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            blueprint,
            props: Map::new(),
            style: Map::new(),
            children: Vec::new(),
            parent,
            list_scope: None,
            page_id,
            root_key: root_key.into(),
            events: Emitter::new(),
        }
    }

    pub fn with_list_scope(mut self, list_scope: Option<ListScope>) -> Self {
        self.list_scope = list_scope;
        self
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn component_type(&self) -> &str {
        self.blueprint.component_type()
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    /// Final, normalized style
    pub fn style(&self) -> &Map<String, Value> {
        &self.style
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn parent(&self) -> Option<&ComponentId> {
        self.parent.as_ref()
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    /// Name of the page whose data this node resolves against
    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    pub fn list_scope(&self) -> Option<&ListScope> {
        self.list_scope.as_ref()
    }

    pub fn list_id(&self) -> Option<&ComponentId> {
        match &self.kind {
            NodeKind::List(_) => Some(&self.id),
            NodeKind::ListRow(row) => Some(&row.list_id),
            _ => self.list_scope.as_ref().map(|scope| &scope.list_id),
        }
    }

    pub fn list_index(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::ListRow(row) => Some(row.list_index),
            _ => None,
        }
    }

    pub fn iterator_var(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::List(list) => Some(list.iterator_var.as_str()),
            NodeKind::ListRow(row) => Some(row.iterator_var.as_str()),
            _ => self
                .list_scope
                .as_ref()
                .map(|scope| scope.iterator_var.as_str()),
        }
    }

    /// The data object a row is bound to
    pub fn data_object(&self) -> Option<DataRef> {
        match &self.kind {
            NodeKind::ListRow(row) => Some(row.data_object.clone()),
            _ => None,
        }
    }

    pub fn list_state(&self) -> Option<&ListState> {
        match &self.kind {
            NodeKind::List(list) => Some(list),
            _ => None,
        }
    }

    pub(crate) fn list_state_mut(&mut self) -> Option<&mut ListState> {
        match &mut self.kind {
            NodeKind::List(list) => Some(list),
            _ => None,
        }
    }

    pub(crate) fn row_state_mut(&mut self) -> Option<&mut RowState> {
        match &mut self.kind {
            NodeKind::ListRow(row) => Some(row),
            _ => None,
        }
    }

    /// Read a property: kind-specific first-class keys, then the working bag. Keys the
    /// resolver never touches fall back to the blueprint; a key missing from the bag
    /// resolved to undefined and stays unset.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.kind.properties().and_then(|p| p.get_property(key)) {
            return Some(value);
        }
        match key {
            "id" => return Some(Value::String(self.id.to_string())),
            "style" => return Some(Value::Object(self.style.clone())),
            "listId" => return self.list_id().map(|id| Value::String(id.to_string())),
            "iteratorVar" => return self.iterator_var().map(|v| Value::String(v.to_string())),
            _ => {}
        }
        match self.props.get(key) {
            Some(value) => Some(value.clone()),
            None if STRUCTURAL_KEYS.contains(&key) => self.blueprint.get(key).cloned(),
            None => None,
        }
    }

    /// Write a property into the working bag (rows write `dataObject` through to the list).
    pub fn set(&mut self, key: &str, value: Value) {
        if let Some(props) = self.kind.properties_mut() {
            if props.set_property(key, &value) {
                return;
            }
        }
        match (key, value) {
            ("style", Value::Object(style)) => self.style = style,
            (key, value) => {
                self.props.insert(key.to_string(), value);
            }
        }
    }

    /// Resolved property bag as a single value (for ancestor lookups)
    pub fn props_value(&self) -> Value {
        let mut bag = self.props.clone();
        bag.insert("style".to_string(), Value::Object(self.style.clone()));
        bag.insert("id".to_string(), Value::String(self.id.to_string()));
        if let Some(index) = self.list_index() {
            bag.insert("listIndex".to_string(), Value::from(index));
        }
        Value::Object(bag)
    }

    pub fn on(
        &mut self,
        event: NodeEvent,
        callback: impl FnMut(&NodeEventPayload) + 'static,
    ) -> ListenerId {
        self.events.on(event, callback)
    }

    pub fn off(&mut self, event: NodeEvent, id: ListenerId) -> bool {
        self.events.off(&event, id)
    }

    pub fn emit(&mut self, event: NodeEvent, payload: &NodeEventPayload) {
        self.events.emit(&event, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(kind: NodeKind, spec: Value) -> ComponentNode {
        ComponentNode::new(
            ComponentId::from("n1"),
            kind,
            Blueprint::new(spec),
            None,
            PageId::from("p1"),
            "Home",
        )
    }

    #[test]
    fn test_get_reads_working_bag() {
        let mut n = node(NodeKind::Generic, json!({ "type": "label", "text": "..title" }));
        assert_eq!(n.get("text"), None);
        assert_eq!(n.get("type"), Some(json!("label")));
        n.set("text", json!("Hello"));
        assert_eq!(n.get("text"), Some(json!("Hello")));
        assert_eq!(n.blueprint().get("text"), Some(&json!("..title")));
    }

    #[test]
    fn test_row_first_class_properties() {
        let data = data_ref(json!({ "name": "a" }));
        let row = RowState {
            list_id: ComponentId::from("list"),
            list_index: 2,
            iterator_var: "item".to_string(),
            data_object: data.clone(),
        };
        let mut n = node(NodeKind::ListRow(row), json!({ "type": "listItem", "listIndex": 9 }));
        assert_eq!(n.get("listIndex"), Some(json!(2)));
        assert_eq!(n.get("listId"), Some(json!("list")));
        assert_eq!(n.get("iteratorVar"), Some(json!("item")));

        n.set("dataObject", json!({ "name": "b" }));
        assert_eq!(*data.borrow(), json!({ "name": "b" }));
    }

    #[test]
    fn test_list_scope_propagates_ids() {
        let n = node(NodeKind::Generic, json!({ "type": "label" })).with_list_scope(Some(
            ListScope {
                list_id: ComponentId::from("list"),
                iterator_var: "item".to_string(),
            },
        ));
        assert_eq!(n.list_id().map(ComponentId::as_str), Some("list"));
        assert_eq!(n.iterator_var(), Some("item"));
        assert_eq!(n.list_index(), None);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(NodeEvent::AddDataObject.to_string(), "add-data-object");
        assert_eq!(NodeEvent::UpdateListItem.as_str(), "update-list-item");
    }
}
