//! List data management.
//!
//! A list node owns its `listObject` and keeps exactly one row node per element, in the
//! same order. Every operation goes through a [`ListController`] obtained from
//! [`Session::list`], so rows are created, evicted and re-indexed in the same step that
//! changes the data.

use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::blueprint::row_blueprint;
use crate::error::{ListError, NoodlError, NoodlResult};
use crate::node::{
    data_ref, ComponentId, ComponentNode, DataRef, ListScope, ListSource, ListState, NodeEvent,
    NodeEventPayload, NodeKind, RowState,
};
use crate::resolver::{get_path_mut, DataLocation};
use crate::session::{BuildContext, Session};

/// Picks one element of a list's data
pub enum DataSelector {
    Index(usize),
    /// The element that is this very object
    Ref(DataRef),
    /// The first element the predicate accepts
    Predicate(Box<dyn Fn(&Value) -> bool>),
}

impl DataSelector {
    pub fn predicate(predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        DataSelector::Predicate(Box::new(predicate))
    }
}

impl fmt::Debug for DataSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSelector::Index(index) => f.debug_tuple("Index").field(index).finish(),
            DataSelector::Ref(data) => f.debug_tuple("Ref").field(&data.borrow()).finish(),
            DataSelector::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<usize> for DataSelector {
    fn from(index: usize) -> Self {
        DataSelector::Index(index)
    }
}

impl From<DataRef> for DataSelector {
    fn from(data: DataRef) -> Self {
        DataSelector::Ref(data)
    }
}

/// Outcome of a list operation. Failures are reported here rather than as errors.
#[derive(Debug, Clone)]
pub struct ListResult {
    pub index: Option<usize>,
    pub data_object: Option<DataRef>,
    pub success: bool,
    pub error: Option<ListError>,
}

impl ListResult {
    pub fn ok(index: usize, data_object: DataRef) -> Self {
        Self {
            index: Some(index),
            data_object: Some(data_object),
            success: true,
            error: None,
        }
    }

    pub fn err(error: ListError) -> Self {
        Self {
            index: None,
            data_object: None,
            success: false,
            error: Some(error),
        }
    }
}

fn not_a_list(node: &ComponentNode) -> NoodlError {
    NoodlError::NotAList {
        id: node.id().to_string(),
        kind: node.kind().name().to_string(),
    }
}

/// Merge objects, concatenate arrays, replace anything else.
fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => target.extend(patch),
        (Value::Array(target), Value::Array(patch)) => target.extend(patch),
        (target, patch) => *target = patch,
    }
}

/// Mutable handle on one list node of a [`Session`]
pub struct ListController<'a> {
    session: &'a mut Session,
    list_id: ComponentId,
}

impl<'a> ListController<'a> {
    pub(crate) fn new(session: &'a mut Session, list_id: ComponentId) -> Self {
        Self { session, list_id }
    }

    pub fn id(&self) -> &ComponentId {
        &self.list_id
    }

    fn state(&self) -> NoodlResult<&ListState> {
        let node = self.session.node(self.list_id.as_str())?;
        node.list_state().ok_or_else(|| not_a_list(node))
    }

    fn state_mut(&mut self) -> NoodlResult<&mut ListState> {
        let node = self.session.node_mut(self.list_id.as_str())?;
        let kind = node.kind().name();
        let id = node.id().to_string();
        node.list_state_mut().ok_or(NoodlError::NotAList {
            id,
            kind: kind.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.state().map(ListState::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the backing array; `None` while uninitialized
    pub fn list_object(&self) -> Option<Value> {
        self.state().ok().and_then(ListState::list_object_value)
    }

    /// The shared elements themselves
    pub fn data_objects(&self) -> Vec<DataRef> {
        self.state()
            .ok()
            .and_then(|state| state.list_object.clone())
            .unwrap_or_default()
    }

    pub fn rows(&self) -> Vec<ComponentId> {
        self.session
            .component(self.list_id.as_str())
            .map(|node| node.children().to_vec())
            .unwrap_or_default()
    }

    fn emit(&mut self, event: NodeEvent, payload: &NodeEventPayload) -> NoodlResult<()> {
        self.session
            .node_mut(self.list_id.as_str())?
            .emit(event, payload);
        Ok(())
    }

    fn payload(&self, index: usize, data: &DataRef) -> NodeEventPayload {
        NodeEventPayload::new(self.list_id.clone())
            .with_index(index)
            .with_data(data.clone())
    }

    fn locate(&self, selector: &DataSelector) -> NoodlResult<Result<(usize, DataRef), ListError>> {
        let Some(items) = self.state()?.list_object.as_ref() else {
            return Ok(Err(ListError::Uninitialized));
        };
        let found = match selector {
            DataSelector::Index(index) => items
                .get(*index)
                .map(|data| (*index, data.clone()))
                .ok_or(ListError::IndexOutOfRange {
                    index: *index,
                    len: items.len(),
                }),
            DataSelector::Ref(target) => items
                .iter()
                .position(|data| Rc::ptr_eq(data, target))
                .map(|index| (index, target.clone()))
                .ok_or(ListError::NoMatch),
            DataSelector::Predicate(predicate) => items
                .iter()
                .position(|data| predicate(&*data.borrow()))
                .map(|index| (index, items[index].clone()))
                .ok_or(ListError::NoMatch),
        };
        Ok(found)
    }

    /// Append a data object and create its row. An uninitialized list starts out empty.
    pub fn add_data_object(&mut self, value: Value) -> NoodlResult<ListResult> {
        let data = data_ref(value);
        let index = {
            let state = self.state_mut()?;
            let items = state.list_object.get_or_insert_with(Vec::new);
            items.push(data.clone());
            items.len() - 1
        };

        let payload = self.payload(index, &data);
        self.emit(NodeEvent::AddDataObject, &payload)?;
        let row = self.session.create_row(&self.list_id, index, data.clone())?;
        self.emit(NodeEvent::CreateListItem, &payload.with_child(row))?;
        self.session.reindex_rows(&self.list_id)?;
        self.session.write_back(&self.list_id)?;
        Ok(ListResult::ok(index, data))
    }

    pub fn get_data_object(&mut self, selector: impl Into<DataSelector>) -> NoodlResult<ListResult> {
        let (index, data) = match self.locate(&selector.into())? {
            Ok(found) => found,
            Err(error) => {
                debug!("get_data_object on list {}: {}", self.list_id, error);
                return Ok(ListResult::err(error));
            }
        };
        let payload = self.payload(index, &data);
        self.emit(NodeEvent::RetrieveDataObject, &payload)?;
        Ok(ListResult::ok(index, data))
    }

    /// Remove a data object and evict the row bound to it.
    pub fn remove_data_object(
        &mut self,
        selector: impl Into<DataSelector>,
    ) -> NoodlResult<ListResult> {
        let (index, data) = match self.locate(&selector.into())? {
            Ok(found) => found,
            Err(error) => {
                debug!("remove_data_object on list {}: {}", self.list_id, error);
                return Ok(ListResult::err(error));
            }
        };
        if let Some(items) = self.state_mut()?.list_object.as_mut() {
            items.remove(index);
        }

        let payload = self.payload(index, &data);
        self.emit(NodeEvent::DeleteDataObject, &payload)?;
        let row = self.session.detach_row(&self.list_id, &data)?;
        let payload = match row {
            Some(row) => payload.with_child(row),
            None => payload,
        };
        self.emit(NodeEvent::RemoveListItem, &payload)?;
        self.session.reindex_rows(&self.list_id)?;
        self.session.write_back(&self.list_id)?;
        Ok(ListResult::ok(index, data))
    }

    /// Merge `patch` into a data object in place and re-resolve its row.
    pub fn update_data_object(
        &mut self,
        selector: impl Into<DataSelector>,
        patch: Value,
    ) -> NoodlResult<ListResult> {
        let (index, data) = match self.locate(&selector.into())? {
            Ok(found) => found,
            Err(error) => {
                debug!("update_data_object on list {}: {}", self.list_id, error);
                return Ok(ListResult::err(error));
            }
        };
        merge(&mut data.borrow_mut(), patch);

        let payload = self.payload(index, &data);
        self.emit(NodeEvent::UpdateDataObject, &payload)?;

        let row = self.rows().get(index).cloned();
        let payload = match row {
            Some(row) => {
                if let Some(state) = self
                    .session
                    .component_mut(row.as_str())
                    .and_then(|node| node.row_state_mut())
                {
                    state.data_object = data.clone();
                }
                self.session.refresh(row.as_str())?;
                payload.with_child(row)
            }
            None => {
                warn!("List {} has no row at index {}", self.list_id, index);
                payload
            }
        };
        self.emit(NodeEvent::UpdateListItem, &payload)?;
        self.session.reindex_rows(&self.list_id)?;
        self.session.write_back(&self.list_id)?;
        Ok(ListResult::ok(index, data))
    }
}

impl Session {
    /// Resolve a freshly built list's `listObject` and build one row per element.
    pub(crate) fn init_list(&mut self, list_id: &ComponentId) -> NoodlResult<()> {
        let (items, source, row_spec, iterator_var) =
            self.with_scopes(list_id.as_str(), |session, node, scopes| {
                let blueprint = node.blueprint();
                let iterator_var = blueprint.iterator_var().to_string();
                let (items, location) = match blueprint.get("listObject") {
                    Some(Value::String(raw)) => match session.resolver().locate_str(raw, scopes) {
                        Some((items, location)) => (Some(items), location),
                        None => (None, None),
                    },
                    Some(value) => (Some(value.clone()), None),
                    None => (None, None),
                };
                let source = location.and_then(|location| match location {
                    DataLocation::Page(page, path) => Some(ListSource::Page { page, path }),
                    DataLocation::Row(index, path) => session
                        .enclosing_rows(list_id.as_str())
                        .get(index)
                        .map(|row| ListSource::Row {
                            row: row.id().clone(),
                            path,
                        }),
                });
                let row_spec = row_blueprint(blueprint, list_id.as_str(), &iterator_var);
                (items, source, row_spec, iterator_var)
            })?;

        let list_object: Option<Vec<DataRef>> = match items {
            Some(Value::Array(items)) => Some(items.into_iter().map(data_ref).collect()),
            Some(other) => {
                warn!("listObject of list {} is not an array: {}", list_id, other);
                None
            }
            None => {
                debug!("List {} has no listObject yet", list_id);
                None
            }
        };

        let node = self.node_mut(list_id.as_str())?;
        let kind = node.kind().name();
        let Some(state) = node.list_state_mut() else {
            return Err(NoodlError::NotAList {
                id: list_id.to_string(),
                kind: kind.to_string(),
            });
        };
        state.iterator_var = iterator_var;
        state.row_blueprint = Some(row_spec);
        state.list_object = list_object.clone();
        state.source = list_object.as_ref().and(source);

        for (index, data) in list_object.into_iter().flatten().enumerate() {
            self.create_row(list_id, index, data)?;
        }
        self.reindex_rows(list_id)
    }

    /// Build a row from the list's row blueprint, bound to `data`, as the list's last child.
    pub(crate) fn create_row(
        &mut self,
        list_id: &ComponentId,
        index: usize,
        data: DataRef,
    ) -> NoodlResult<ComponentId> {
        let list = self.node(list_id.as_str())?;
        let state = list.list_state().ok_or_else(|| not_a_list(list))?;
        let iterator_var = state.iterator_var.clone();
        let spec = match &state.row_blueprint {
            Some(spec) => spec.clone(),
            None => row_blueprint(list.blueprint(), list_id.as_str(), &iterator_var),
        };
        let ctx = BuildContext {
            page_id: list.page_id().clone(),
            root_key: list.root_key().to_string(),
            list_scope: Some(ListScope {
                list_id: list_id.clone(),
                iterator_var: iterator_var.clone(),
            }),
        };
        let kind = NodeKind::ListRow(RowState {
            list_id: list_id.clone(),
            list_index: index,
            iterator_var,
            data_object: data,
        });
        self.build_node(&spec, Some(list_id), &ctx, Some(kind))
    }

    /// Detach the row holding `data` and evict it with its descendants.
    pub(crate) fn detach_row(
        &mut self,
        list_id: &ComponentId,
        data: &DataRef,
    ) -> NoodlResult<Option<ComponentId>> {
        let row = self
            .node(list_id.as_str())?
            .children()
            .iter()
            .find(|child| {
                self.component(child.as_str())
                    .and_then(ComponentNode::data_object)
                    .map(|held| Rc::ptr_eq(&held, data))
                    .unwrap_or(false)
            })
            .cloned();
        let Some(row) = row else {
            warn!("List {} has no row for the removed data object", list_id);
            return Ok(None);
        };
        self.detach(row.as_str())?;
        self.components_mut().remove_subtree(row.as_str());
        Ok(Some(row))
    }

    /// Copy a list's data back into the array its `listObject` was bound to. A list bound
    /// inside a row's data object passes the change on to that row's list.
    pub(crate) fn write_back(&mut self, list_id: &ComponentId) -> NoodlResult<()> {
        let state = self.node(list_id.as_str())?.list_state();
        let (Some(source), Some(items)) = (
            state.and_then(|state| state.source.clone()),
            state.and_then(ListState::list_object_value),
        ) else {
            return Ok(());
        };

        match source {
            ListSource::Page { page, path } => {
                match self.root_mut().get_mut(&page).and_then(|page| get_path_mut(page, &path)) {
                    Some(target) => *target = items,
                    None => warn!("List {} lost its array at {}.{}", list_id, page, path.join(".")),
                }
            }
            ListSource::Row { row, path } => {
                let Some(node) = self.component(row.as_str()) else {
                    warn!("List {} outlived row {}", list_id, row);
                    return Ok(());
                };
                let (Some(data), Some(owner)) = (node.data_object(), node.list_id().cloned()) else {
                    return Ok(());
                };
                match get_path_mut(&mut data.borrow_mut(), &path) {
                    Some(target) => *target = items,
                    None => warn!("List {} lost its array in row {}", list_id, row),
                }
                self.write_back(&owner)?;
            }
        }
        Ok(())
    }

    /// Recompute every row's `listIndex` from its position among the list's children.
    pub(crate) fn reindex_rows(&mut self, list_id: &ComponentId) -> NoodlResult<()> {
        let rows = self.node(list_id.as_str())?.children().to_vec();
        for (index, row) in rows.iter().enumerate() {
            if let Some(state) = self
                .component_mut(row.as_str())
                .and_then(|node| node.row_state_mut())
            {
                state.list_index = index;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    fn list_session(items: Value) -> (Session, ComponentId) {
        let root = json!({ "Home": { "items": items } });
        let mut session = Session::new(Config::default(), root.as_object().cloned().unwrap());
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({
                    "type": "list",
                    "id": "list",
                    "iteratorVar": "item",
                    "listObject": "..items",
                    "children": [{
                        "type": "listItem",
                        "children": [{ "type": "label", "dataKey": "item.name", "text": "item.name" }]
                    }]
                }),
            )
            .unwrap();
        (session, id)
    }

    fn assert_rows_in_sync(session: &mut Session, id: &ComponentId) {
        let rows = session.component(id.as_str()).unwrap().children().to_vec();
        let data = session.list(id.as_str()).unwrap().data_objects();
        assert_eq!(rows.len(), data.len());
        for (index, row) in rows.iter().enumerate() {
            let node = session.component(row.as_str()).unwrap();
            assert_eq!(node.list_index(), Some(index));
            assert!(Rc::ptr_eq(&node.data_object().unwrap(), &data[index]));
        }
    }

    fn label_text(session: &Session, row: &ComponentId) -> Option<Value> {
        let row = session.component(row.as_str()).unwrap();
        session.component(row.children()[0].as_str()).unwrap().get("text")
    }

    #[test]
    fn test_rows_built_from_list_object() {
        let (mut session, id) = list_session(json!([{ "name": "a" }, { "name": "b" }]));
        assert_rows_in_sync(&mut session, &id);

        let rows = session.list(id.as_str()).unwrap().rows();
        assert_eq!(label_text(&session, &rows[1]), Some(json!("b")));
        let row = session.component(rows[1].as_str()).unwrap();
        assert_eq!(row.get("listId"), Some(json!("list")));
        assert_eq!(row.get("iteratorVar"), Some(json!("item")));
        let label = session.component(row.children()[0].as_str()).unwrap();
        assert_eq!(label.list_id().map(ComponentId::as_str), Some("list"));
        assert_eq!(label.props().get("data-value"), Some(&json!("b")));
        assert_ne!(rows[0], rows[1]);
    }

    #[test]
    fn test_add_fires_data_event_then_row_event() {
        let (mut session, id) = list_session(json!([]));
        let log = Rc::new(RefCell::new(Vec::new()));
        let node = session.component_mut(id.as_str()).unwrap();
        for event in [NodeEvent::CreateListItem, NodeEvent::AddDataObject] {
            let log = log.clone();
            node.on(event, move |payload| {
                log.borrow_mut().push((event.as_str(), payload.index))
            });
        }

        let result = session
            .list(id.as_str())
            .unwrap()
            .add_data_object(json!({ "name": "new" }))
            .unwrap();
        assert!(result.success);
        assert_eq!(result.index, Some(0));
        assert_eq!(
            *log.borrow(),
            vec![("add-data-object", Some(0)), ("create-list-item", Some(0))]
        );
        assert_rows_in_sync(&mut session, &id);
    }

    #[test]
    fn test_remove_first_reindexes_second() {
        let (mut session, id) = list_session(json!([{ "name": "a" }, { "name": "b" }]));
        let second = session.list(id.as_str()).unwrap().rows()[1].clone();

        let result = session.list(id.as_str()).unwrap().remove_data_object(0usize).unwrap();
        assert!(result.success);
        assert_eq!(result.data_object.as_ref().map(|d| d.borrow().clone()), Some(json!({ "name": "a" })));

        let rows = session.list(id.as_str()).unwrap().rows();
        assert_eq!(rows, vec![second.clone()]);
        assert_eq!(session.component(second.as_str()).unwrap().list_index(), Some(0));
        assert_eq!(session.components().len(), 3);
        assert_rows_in_sync(&mut session, &id);
    }

    #[test]
    fn test_remove_by_reference_and_predicate() {
        let (mut session, id) =
            list_session(json!([{ "name": "a" }, { "name": "b" }, { "name": "c" }]));
        let target = session.list(id.as_str()).unwrap().data_objects()[1].clone();

        let mut list = session.list(id.as_str()).unwrap();
        let result = list.remove_data_object(target).unwrap();
        assert_eq!(result.index, Some(1));
        let result = list
            .remove_data_object(DataSelector::predicate(|v| v["name"] == "c"))
            .unwrap();
        assert_eq!(result.index, Some(1));
        assert_eq!(list.list_object(), Some(json!([{ "name": "a" }])));
        assert_rows_in_sync(&mut session, &id);
    }

    #[test]
    fn test_failures_are_results() {
        let (mut session, id) = list_session(json!([{ "name": "a" }]));
        let mut list = session.list(id.as_str()).unwrap();

        let result = list.get_data_object(3usize).unwrap();
        assert!(!result.success);
        assert_eq!(result.error, Some(ListError::IndexOutOfRange { index: 3, len: 1 }));

        let result = list
            .remove_data_object(DataSelector::predicate(|v| v["name"] == "zzz"))
            .unwrap();
        assert_eq!(result.error, Some(ListError::NoMatch));

        let result = list.update_data_object(9usize, json!({})).unwrap();
        assert!(!result.success);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_uninitialized_list() {
        let root = json!({ "Home": {} });
        let mut session = Session::new(Config::default(), root.as_object().cloned().unwrap());
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({ "type": "list", "children": [{ "type": "listItem" }] }),
            )
            .unwrap();

        let mut list = session.list(id.as_str()).unwrap();
        assert_eq!(list.list_object(), None);
        let result = list.get_data_object(0usize).unwrap();
        assert_eq!(result.error, Some(ListError::Uninitialized));

        let result = list.add_data_object(json!({ "n": 1 })).unwrap();
        assert!(result.success);
        assert_eq!(list.list_object(), Some(json!([{ "n": 1 }])));
        assert_rows_in_sync(&mut session, &id);
    }

    #[test]
    fn test_update_merges_and_re_resolves_row() {
        let (mut session, id) = list_session(json!([{ "name": "a", "tags": ["x"] }]));
        let row = session.list(id.as_str()).unwrap().rows()[0].clone();
        let fired = Rc::new(RefCell::new(0));
        {
            let fired = fired.clone();
            session
                .component_mut(id.as_str())
                .unwrap()
                .on(NodeEvent::UpdateListItem, move |_| *fired.borrow_mut() += 1);
        }

        let mut list = session.list(id.as_str()).unwrap();
        list.update_data_object(0usize, json!({ "name": "renamed" })).unwrap();
        list.update_data_object(
            DataSelector::predicate(|v| v["name"] == "renamed"),
            json!({ "tags": ["y"] }),
        )
        .unwrap();
        assert_eq!(
            list.list_object(),
            Some(json!([{ "name": "renamed", "tags": ["x", "y"] }]))
        );

        assert_eq!(*fired.borrow(), 2);
        assert_eq!(label_text(&session, &row), Some(json!("renamed")));
        assert_rows_in_sync(&mut session, &id);
    }

    #[test]
    fn test_row_data_is_shared_with_list() {
        let (mut session, id) = list_session(json!([{ "name": "a" }]));
        let row = session.list(id.as_str()).unwrap().rows()[0].clone();
        session
            .component_mut(row.as_str())
            .unwrap()
            .set("dataObject", json!({ "name": "through row" }));
        assert_eq!(
            session.list(id.as_str()).unwrap().list_object(),
            Some(json!([{ "name": "through row" }]))
        );
    }

    #[test]
    fn test_operations_reach_root_object() {
        let (mut session, id) = list_session(json!([{ "name": "a" }]));
        let items = |session: &Session| session.root()["Home"]["items"].clone();

        session
            .list(id.as_str())
            .unwrap()
            .update_data_object(0usize, json!({ "name": "renamed" }))
            .unwrap();
        assert_eq!(items(&session), json!([{ "name": "renamed" }]));

        session
            .list(id.as_str())
            .unwrap()
            .add_data_object(json!({ "name": "b" }))
            .unwrap();
        assert_eq!(items(&session), json!([{ "name": "renamed" }, { "name": "b" }]));

        session.list(id.as_str()).unwrap().remove_data_object(0usize).unwrap();
        assert_eq!(items(&session), json!([{ "name": "b" }]));

        let row = session.list(id.as_str()).unwrap().rows()[0].clone();
        session
            .set(row.as_str(), "dataObject", json!({ "name": "through row" }))
            .unwrap();
        assert_eq!(items(&session), json!([{ "name": "through row" }]));
    }

    #[test]
    fn test_inline_list_object_has_no_source() {
        let root = json!({ "Home": {} });
        let mut session = Session::new(Config::default(), root.as_object().cloned().unwrap());
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({
                    "type": "list",
                    "listObject": [{ "name": "a" }],
                    "children": [{ "type": "listItem" }]
                }),
            )
            .unwrap();
        session
            .list(id.as_str())
            .unwrap()
            .add_data_object(json!({ "name": "b" }))
            .unwrap();
        let node = session.component(id.as_str()).unwrap();
        assert_eq!(node.list_state().and_then(|s| s.source.clone()), None);
        assert_eq!(session.root()["Home"], json!({}));
    }

    fn nested_session() -> (Session, ComponentId) {
        let root = json!({ "Home": { "groups": [
            { "title": "Team", "members": [{ "n": "Ada" }, { "n": "Bob" }] },
            { "title": "Guests", "members": [] }
        ]}});
        let mut session = Session::new(Config::default(), root.as_object().cloned().unwrap());
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({
                    "type": "list",
                    "id": "groups",
                    "iteratorVar": "group",
                    "listObject": "..groups",
                    "children": [{
                        "type": "listItem",
                        "children": [
                            { "type": "label", "text": "group.title" },
                            {
                                "type": "list",
                                "iteratorVar": "member",
                                "listObject": "group.members",
                                "children": [{
                                    "type": "listItem",
                                    "children": [
                                        { "type": "label", "text": "member.n" },
                                        { "type": "label", "text": "group.title" }
                                    ]
                                }]
                            }
                        ]
                    }]
                }),
            )
            .unwrap();
        (session, id)
    }

    #[test]
    fn test_nested_list_binds_both_iterators() {
        let (mut session, id) = nested_session();
        let outer_rows = session.list(id.as_str()).unwrap().rows();
        let inner = session.component(outer_rows[0].as_str()).unwrap().children()[1].clone();

        let inner_node = session.component(inner.as_str()).unwrap();
        assert_eq!(inner_node.iterator_var(), Some("member"));
        assert_eq!(inner_node.list_id(), Some(&inner));

        let inner_rows = session.list(inner.as_str()).unwrap().rows();
        assert_eq!(inner_rows.len(), 2);
        let texts: Vec<Option<Value>> = session
            .component(inner_rows[1].as_str())
            .unwrap()
            .children()
            .iter()
            .map(|child| session.component(child.as_str()).unwrap().get("text"))
            .collect();
        assert_eq!(texts, vec![Some(json!("Bob")), Some(json!("Team"))]);

        let guests = session.component(outer_rows[1].as_str()).unwrap().children()[1].clone();
        assert!(session.list(guests.as_str()).unwrap().is_empty());
    }

    #[test]
    fn test_nested_list_writes_through_outer_row() {
        let (mut session, id) = nested_session();
        let outer_rows = session.list(id.as_str()).unwrap().rows();
        let guests = session.component(outer_rows[1].as_str()).unwrap().children()[1].clone();

        session
            .list(guests.as_str())
            .unwrap()
            .add_data_object(json!({ "n": "Cy" }))
            .unwrap();

        let expected = json!({ "title": "Guests", "members": [{ "n": "Cy" }] });
        let outer_data = session.list(id.as_str()).unwrap().data_objects();
        assert_eq!(*outer_data[1].borrow(), expected);
        assert_eq!(session.root()["Home"]["groups"][1], expected);
    }

    enum Op {
        Add(&'static str),
        Remove(usize),
        Update(usize, &'static str),
    }

    #[test]
    fn test_invariant_over_mixed_operations() {
        let (mut session, id) = list_session(json!([{ "name": "a" }]));
        let ops = [
            Op::Add("b"),
            Op::Add("c"),
            Op::Remove(1),
            Op::Update(1, "C"),
            Op::Remove(0),
            Op::Add("d"),
        ];
        for op in ops {
            let mut list = session.list(id.as_str()).unwrap();
            let result = match op {
                Op::Add(name) => list.add_data_object(json!({ "name": name })),
                Op::Remove(index) => list.remove_data_object(index),
                Op::Update(index, name) => list.update_data_object(index, json!({ "name": name })),
            }
            .unwrap();
            assert!(result.success);
            assert_rows_in_sync(&mut session, &id);
        }
        assert_eq!(
            session.list(id.as_str()).unwrap().list_object(),
            Some(json!([{ "name": "C" }, { "name": "d" }]))
        );
    }

    #[test]
    fn test_remove_component_on_row_goes_through_list() {
        let (mut session, id) = list_session(json!([{ "name": "a" }, { "name": "b" }]));
        let first = session.list(id.as_str()).unwrap().rows()[0].clone();
        let removed = session.remove_component(first.as_str()).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(
            session.list(id.as_str()).unwrap().list_object(),
            Some(json!([{ "name": "b" }]))
        );
        assert_rows_in_sync(&mut session, &id);
    }
}
