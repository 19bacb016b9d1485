//! Tree building and orchestration.
//!
//! A [`Session`] owns the root object, the configuration and both caches. Hosts hand it
//! raw component specifications; it builds node trees from them, resolves every node's
//! properties and style against the page it belongs to, and expands lists into rows.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::blueprint::{Blueprint, LIST_TYPE, PAGE_TYPE, STRUCTURAL_KEYS, VERBATIM_KEYS};
use crate::cache::{ComponentCache, PageCache};
use crate::config::Config;
use crate::error::{NoodlError, NoodlResult};
use crate::list::{DataSelector, ListController};
use crate::node::{
    ComponentId, ComponentNode, ListScope, ListState, NodeEvent, NodeEventPayload, NodeKind,
    PageScope,
};
use crate::page::{Page, PageId};
use crate::resolver::{Resolver, Scopes};
use crate::style::{data_attributes, StyleNormalizer};
use crate::viewport::Viewport;

/// What a node inherits from the place it is built in
#[derive(Debug, Clone)]
pub(crate) struct BuildContext {
    pub page_id: PageId,
    pub root_key: String,
    pub list_scope: Option<ListScope>,
}

pub struct Session {
    config: Config,
    resolver: Resolver,
    root: Map<String, Value>,
    components: ComponentCache,
    pages: PageCache,
}

impl Session {
    pub fn new(config: Config, root: Map<String, Value>) -> Self {
        let resolver = Resolver::new(&config);
        Self {
            config,
            resolver,
            root,
            components: ComponentCache::new(),
            pages: PageCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Page name → page data object
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Mutable root object. Call [`refresh`](Self::refresh) afterwards to re-resolve nodes.
    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    pub fn components(&self) -> &ComponentCache {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentCache {
        &mut self.components
    }

    pub fn pages(&self) -> &PageCache {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut PageCache {
        &mut self.pages
    }

    pub fn component(&self, id: &str) -> Option<&ComponentNode> {
        self.components.get(id)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut ComponentNode> {
        self.components.get_mut(id)
    }

    pub(crate) fn node(&self, id: &str) -> NoodlResult<&ComponentNode> {
        self.components
            .get(id)
            .ok_or_else(|| NoodlError::ComponentNotFound { id: id.to_string() })
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> NoodlResult<&mut ComponentNode> {
        self.components
            .get_mut(id)
            .ok_or_else(|| NoodlError::ComponentNotFound { id: id.to_string() })
    }

    /// Register a page. Its data object is `root[page_name]`.
    pub fn create_page(&mut self, page_name: &str, viewport: Option<Viewport>) -> PageId {
        let viewport = viewport.unwrap_or_else(|| self.config.viewport.into());
        let page = Page::new(PageId::generate(), page_name, viewport);
        let id = page.id.clone();
        if !self.root.contains_key(page_name) {
            debug!("Page '{}' has no data object in the root object yet", page_name);
        }
        self.pages.add(page);
        info!("Created page '{}' ({})", page_name, id);
        id
    }

    /// Build a top-level component of a page from its specification.
    pub fn create_component(&mut self, page_id: &str, spec: &Value) -> NoodlResult<ComponentId> {
        if !spec.is_object() {
            return Err(NoodlError::InvalidBlueprint {
                reason: format!("component specification must be an object, got {}", spec),
            });
        }
        let page = self
            .pages
            .get(page_id)
            .ok_or_else(|| NoodlError::PageNotFound { id: page_id.to_string() })?;
        let ctx = BuildContext {
            page_id: page.id.clone(),
            root_key: page.page_name.clone(),
            list_scope: None,
        };

        let id = self.build_node(spec, None, &ctx, None)?;
        if let Some(page) = self.pages.get_mut(page_id) {
            page.components.push(id.clone());
        }
        Ok(id)
    }

    /// Build every entry of the page object's `components` array.
    pub fn create_page_components(&mut self, page_id: &str) -> NoodlResult<Vec<ComponentId>> {
        let page_name = self
            .pages
            .get(page_id)
            .map(|page| page.page_name.clone())
            .ok_or_else(|| NoodlError::PageNotFound { id: page_id.to_string() })?;

        let specs = match self.root.get(&page_name).and_then(|page| page.get("components")) {
            Some(Value::Array(specs)) => specs.clone(),
            Some(other) => {
                warn!("'{}.components' is not an array: {}", page_name, other);
                return Ok(Vec::new());
            }
            None => {
                debug!("Page '{}' declares no components", page_name);
                return Ok(Vec::new());
            }
        };

        let mut ids = Vec::with_capacity(specs.len());
        for spec in &specs {
            if !spec.is_object() {
                warn!("Skipping non-object component of '{}': {}", page_name, spec);
                continue;
            }
            ids.push(self.create_component(page_id, spec)?);
        }
        Ok(ids)
    }

    /// Re-resolve a node and everything below it.
    pub fn refresh(&mut self, id: &str) -> NoodlResult<()> {
        self.resolve_node(id)?;
        let children = self.node(id)?.children().to_vec();
        for child in children {
            self.refresh(child.as_str())?;
        }
        Ok(())
    }

    /// Change a page's viewport and re-resolve its components against it.
    pub fn resize(&mut self, page_id: &str, width: f64, height: f64) -> NoodlResult<()> {
        let page = self
            .pages
            .get_mut(page_id)
            .ok_or_else(|| NoodlError::PageNotFound { id: page_id.to_string() })?;
        page.viewport.set_size(width, height);
        let components = page.components.clone();
        debug!("Resized page {} to {}x{}", page_id, width, height);
        for id in components {
            self.refresh(id.as_str())?;
        }
        Ok(())
    }

    /// Detach a node from its parent and evict it and its descendants from the cache.
    ///
    /// Removing a list row goes through its list, so the list's data stays in step with
    /// its rows.
    pub fn remove_component(&mut self, id: &str) -> NoodlResult<Vec<ComponentId>> {
        let node = self.node(id)?;
        if let (NodeKind::ListRow(row), Some(_)) = (node.kind(), node.parent()) {
            let list_id = row.list_id.clone();
            let data = row.data_object.clone();
            let removed = self.subtree_ids(id);
            self.list(list_id.as_str())?
                .remove_data_object(DataSelector::Ref(data))?;
            return Ok(removed);
        }

        self.detach(id)?;
        let removed = self.components.remove_subtree(id);
        debug!("Removed component {} ({} nodes)", id, removed.len());
        Ok(removed)
    }

    /// Write a property of a node. Writing a row's `dataObject` also updates the array its
    /// list is bound to.
    pub fn set(&mut self, id: &str, key: &str, value: Value) -> NoodlResult<()> {
        let node = self.node_mut(id)?;
        node.set(key, value);
        let list_id = match node.kind() {
            NodeKind::ListRow(row) if key == "dataObject" => Some(row.list_id.clone()),
            _ => None,
        };
        if let Some(list_id) = list_id {
            self.write_back(&list_id)?;
        }
        Ok(())
    }

    /// Handle for the list operations of a list node.
    pub fn list(&mut self, id: &str) -> NoodlResult<ListController<'_>> {
        let node = self.node(id)?;
        if node.list_state().is_none() {
            return Err(NoodlError::NotAList {
                id: id.to_string(),
                kind: node.kind().name().to_string(),
            });
        }
        let list_id = node.id().clone();
        Ok(ListController::new(self, list_id))
    }

    /// Ids of a node and all its descendants, parents first
    pub fn subtree_ids(&self, id: &str) -> Vec<ComponentId> {
        let mut ids = Vec::new();
        if let Some(node) = self.components.get(id) {
            ids.push(node.id().clone());
            for child in node.children() {
                ids.extend(self.subtree_ids(child.as_str()));
            }
        }
        ids
    }

    pub(crate) fn build_node(
        &mut self,
        spec: &Value,
        parent: Option<&ComponentId>,
        ctx: &BuildContext,
        kind: Option<NodeKind>,
    ) -> NoodlResult<ComponentId> {
        let blueprint = Blueprint::new(spec.clone());
        if !blueprint.has_type() {
            warn!("Component specification without a type: {}", blueprint.value());
        }
        let id = self.assign_id(&blueprint, ctx);
        let kind = kind.unwrap_or_else(|| match blueprint.component_type() {
            LIST_TYPE => NodeKind::List(ListState::new(blueprint.iterator_var())),
            PAGE_TYPE => NodeKind::Page(PageScope {
                page_name: blueprint.get_str("path").unwrap_or_default().to_string(),
            }),
            _ => NodeKind::Generic,
        });

        let node = ComponentNode::new(
            id.clone(),
            kind,
            blueprint.clone(),
            parent.cloned(),
            ctx.page_id.clone(),
            ctx.root_key.clone(),
        )
        .with_list_scope(ctx.list_scope.clone());
        self.components.add(node);
        if let Some(parent) = parent {
            self.attach(parent, &id)?;
        }

        self.resolve_node(id.as_str())?;

        let node = self.node_mut(id.as_str())?;
        if let NodeKind::Page(scope) = &mut node.kind {
            if let Some(Value::String(path)) = node.props.get("path") {
                scope.page_name = path.clone();
            }
        }

        let node = self.node(id.as_str())?;
        if node.list_state().is_some() {
            self.init_list(&id)?;
            return Ok(id);
        }
        let child_ctx = self.child_context(ctx, node.kind());
        for child in blueprint.children() {
            self.build_node(child, Some(&id), &child_ctx, None)?;
        }
        Ok(id)
    }

    fn assign_id(&self, blueprint: &Blueprint, ctx: &BuildContext) -> ComponentId {
        // rows are stamped out repeatedly from one blueprint
        if ctx.list_scope.is_some() {
            return ComponentId::generate();
        }
        match blueprint.id() {
            Some(id) if !self.components.contains(id) => ComponentId::from(id),
            Some(id) => {
                debug!("Component id '{}' is already cached, generating a new one", id);
                ComponentId::generate()
            }
            None => ComponentId::generate(),
        }
    }

    fn child_context(&self, ctx: &BuildContext, kind: &NodeKind) -> BuildContext {
        let mut child = ctx.clone();
        if let NodeKind::Page(scope) = kind {
            if scope.page_name.is_empty() {
                warn!("Page component without a path, keeping page '{}'", ctx.root_key);
            } else if !self.root.contains_key(&scope.page_name) {
                warn!("Page component refers to unknown page '{}'", scope.page_name);
            } else {
                child.root_key = scope.page_name.clone();
            }
        }
        child
    }

    fn attach(&mut self, parent: &ComponentId, child: &ComponentId) -> NoodlResult<()> {
        let node = self.node_mut(parent.as_str())?;
        node.children.push(child.clone());
        let payload = NodeEventPayload::new(parent.clone()).with_child(child.clone());
        node.emit(NodeEvent::AddChild, &payload);
        Ok(())
    }

    /// Unlink a node from its parent's children, or from its page when it is top-level.
    pub(crate) fn detach(&mut self, id: &str) -> NoodlResult<()> {
        let node = self.node(id)?;
        let page_id = node.page_id().clone();
        let child = node.id().clone();
        match node.parent().cloned() {
            Some(parent) => {
                if let Some(parent) = self.components.get_mut(parent.as_str()) {
                    parent.children.retain(|c| *c != child);
                    let payload = NodeEventPayload::new(parent.id().clone()).with_child(child);
                    parent.emit(NodeEvent::RemoveChild, &payload);
                }
            }
            None => {
                if let Some(page) = self.pages.get_mut(page_id.as_str()) {
                    page.components.retain(|c| *c != child);
                }
            }
        }
        Ok(())
    }

    /// Run `f` with the data scopes visible to a node. `Scopes::rows` lines up with
    /// [`enclosing_rows`](Self::enclosing_rows).
    pub(crate) fn with_scopes<R>(
        &self,
        id: &str,
        f: impl FnOnce(&Self, &ComponentNode, &Scopes) -> R,
    ) -> NoodlResult<R> {
        let node = self.node(id)?;
        let rows: Vec<(Value, &str)> = self
            .enclosing_rows(id)
            .into_iter()
            .filter_map(|row| {
                let data = row.data_object()?;
                let value = data.borrow().clone();
                Some((value, row.iterator_var()?))
            })
            .collect();
        let ancestor = |depth: usize| self.ancestor_props(id, depth);

        let mut scopes = Scopes::new(&self.root)
            .with_root_key(node.root_key())
            .with_ancestor(&ancestor);
        for (value, iterator_var) in rows.iter().rev() {
            scopes = scopes.with_row(value, iterator_var);
        }
        Ok(f(self, node, &scopes))
    }

    /// Resolve a node's properties, style and data attributes from its blueprint.
    pub(crate) fn resolve_node(&mut self, id: &str) -> NoodlResult<()> {
        let (props, style) = self.with_scopes(id, |session, node, scopes| {
            let blueprint = node.blueprint();
            let mut props = session.resolve_props(blueprint, scopes);

            let style = blueprint
                .style()
                .map(|style| session.resolver.resolve_map(style, scopes))
                .unwrap_or_default();
            let viewport = session.page_viewport(node.page_id());
            let style = StyleNormalizer::new(&viewport)
                .keep_noodl_keys(!session.config.remove_noodl_style_keys)
                .normalize(&style);

            let attributes =
                data_attributes(blueprint, &props, node.list_id(), &session.resolver, scopes);
            props.extend(attributes);
            (props, style)
        })?;

        let node = self.node_mut(id)?;
        node.props = props;
        node.style = style;
        let payload = NodeEventPayload::new(node.id().clone());
        node.emit(NodeEvent::Resolved, &payload);
        Ok(())
    }

    fn resolve_props(&self, blueprint: &Blueprint, scopes: &Scopes) -> Map<String, Value> {
        let mut props = Map::new();
        let Some(spec) = blueprint.as_map() else {
            return props;
        };
        for (key, value) in spec {
            if STRUCTURAL_KEYS.contains(&key.as_str()) {
                continue;
            }
            if VERBATIM_KEYS.contains(&key.as_str()) {
                props.insert(key.clone(), value.clone());
                continue;
            }
            match self.resolver.resolve(value, scopes) {
                Some(resolved) => {
                    props.insert(key.clone(), resolved);
                }
                None => debug!("'{}' of {} did not resolve", key, blueprint.component_type()),
            }
        }
        props
    }

    fn page_viewport(&self, page_id: &PageId) -> Viewport {
        self.pages
            .get(page_id.as_str())
            .map(|page| page.viewport)
            .unwrap_or_else(|| self.config.viewport.into())
    }

    /// List rows containing a node (the node itself included), nearest first
    pub(crate) fn enclosing_rows(&self, id: &str) -> Vec<&ComponentNode> {
        let mut rows = Vec::new();
        let mut current = self.components.get(id);
        while let Some(node) = current {
            if let NodeKind::ListRow(_) = node.kind() {
                rows.push(node);
            }
            current = node
                .parent()
                .and_then(|parent| self.components.get(parent.as_str()));
        }
        rows
    }

    /// Resolved property bag of the ancestor `depth` levels up (1 = parent)
    fn ancestor_props(&self, id: &str, depth: usize) -> Option<Value> {
        let mut current = self.components.get(id)?;
        for _ in 0..depth {
            current = self.components.get(current.parent()?.as_str())?;
        }
        Some(current.props_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn session(root: Value) -> Session {
        Session::new(Config::default(), root.as_object().cloned().unwrap())
    }

    #[test]
    fn test_create_component_resolves_props_and_style() {
        let mut session = session(json!({
            "Home": { "title": "Welcome", "color": "0x3185c7ff" }
        }));
        let page = session.create_page("Home", Some(Viewport::new(400.0, 800.0)));
        let id = session
            .create_component(
                page.as_str(),
                &json!({
                    "type": "label",
                    "text": "..title",
                    "style": { "width": "0.5", "height": "0.1", "color": "..color" }
                }),
            )
            .unwrap();

        let node = session.component(id.as_str()).unwrap();
        assert_eq!(node.get("text"), Some(json!("Welcome")));
        assert_eq!(
            Value::Object(node.style().clone()),
            json!({ "width": "200px", "height": "80px", "color": "#3185c7ff" })
        );
        assert_eq!(
            session.pages().get(page.as_str()).map(|p| p.components.clone()),
            Some(vec![id])
        );
    }

    #[test]
    fn test_undefined_property_stays_unset() {
        let mut session = session(json!({ "Home": { "title": "..missing" } }));
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({ "type": "label", "text": "..missing", "title": "..title" }),
            )
            .unwrap();
        let node = session.component(id.as_str()).unwrap();
        assert_eq!(node.get("text"), None);
        assert_eq!(node.get("title"), None);
        assert_eq!(node.get("type"), Some(json!("label")));
        assert!(!node.props().contains_key("text"));
    }

    #[test]
    fn test_children_linked_both_ways() {
        let mut session = session(json!({ "Home": {} }));
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({ "type": "view", "id": "root", "children": [
                    { "type": "label", "text": "a" },
                    { "type": "label", "text": "b" }
                ]}),
            )
            .unwrap();

        assert_eq!(id.as_str(), "root");
        let children = session.component("root").unwrap().children().to_vec();
        assert_eq!(children.len(), 2);
        for child in &children {
            let node = session.component(child.as_str()).unwrap();
            assert_eq!(node.parent().map(ComponentId::as_str), Some("root"));
        }
        assert_eq!(
            session.component(children[1].as_str()).unwrap().get("text"),
            Some(json!("b"))
        );
    }

    #[test]
    fn test_invalid_specification_is_rejected() {
        let mut session = session(json!({}));
        let page = session.create_page("Home", None);
        assert!(matches!(
            session.create_component(page.as_str(), &json!([1, 2])),
            Err(NoodlError::InvalidBlueprint { .. })
        ));
        assert!(matches!(
            session.create_component("nope", &json!({ "type": "view" })),
            Err(NoodlError::PageNotFound { .. })
        ));
    }

    #[test]
    fn test_parent_traversal_reads_resolved_parent() {
        let mut session = session(json!({ "Home": { "name": "Ada" } }));
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({
                    "type": "view",
                    "title": "..name",
                    "children": [{ "type": "label", "text": "_.title" }]
                }),
            )
            .unwrap();
        let child = session.component(id.as_str()).unwrap().children()[0].clone();
        assert_eq!(
            session.component(child.as_str()).unwrap().get("text"),
            Some(json!("Ada"))
        );
    }

    #[test]
    fn test_page_component_switches_scope() {
        let mut session = session(json!({
            "Home": { "title": "home" },
            "Embedded": { "title": "embedded" }
        }));
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({
                    "type": "page",
                    "path": "Embedded",
                    "title": "..title",
                    "children": [{ "type": "label", "text": "..title" }]
                }),
            )
            .unwrap();
        let node = session.component(id.as_str()).unwrap();
        assert_eq!(node.get("title"), Some(json!("home")));
        let child = session.component(node.children()[0].as_str()).unwrap();
        assert_eq!(child.root_key(), "Embedded");
        assert_eq!(child.get("text"), Some(json!("embedded")));
    }

    #[test]
    fn test_refresh_after_root_change() {
        let mut session = session(json!({ "Home": { "title": "old" } }));
        let page = session.create_page("Home", None);
        let id = session
            .create_component(page.as_str(), &json!({ "type": "label", "text": "..title" }))
            .unwrap();
        session.root_mut().insert("Home".to_string(), json!({ "title": "new" }));
        session.refresh(id.as_str()).unwrap();
        assert_eq!(session.component(id.as_str()).unwrap().get("text"), Some(json!("new")));
    }

    #[test]
    fn test_resize_renormalizes() {
        let mut session = session(json!({ "Home": {} }));
        let page = session.create_page("Home", Some(Viewport::new(100.0, 100.0)));
        let id = session
            .create_component(page.as_str(), &json!({ "type": "view", "style": { "width": "0.5" } }))
            .unwrap();
        assert_eq!(session.component(id.as_str()).unwrap().style()["width"], json!("50px"));
        session.resize(page.as_str(), 300.0, 100.0).unwrap();
        assert_eq!(session.component(id.as_str()).unwrap().style()["width"], json!("150px"));
    }

    #[test]
    fn test_remove_component_evicts_subtree() {
        let mut session = session(json!({ "Home": {} }));
        let page = session.create_page("Home", None);
        let id = session
            .create_component(
                page.as_str(),
                &json!({ "type": "view", "children": [
                    { "type": "view", "id": "inner", "children": [{ "type": "label" }] },
                    { "type": "label", "id": "sibling" }
                ]}),
            )
            .unwrap();
        assert_eq!(session.components().len(), 4);

        let removed = session.remove_component("inner").unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(session.components().len(), 2);
        assert_eq!(
            session.component(id.as_str()).unwrap().children().to_vec(),
            vec![ComponentId::from("sibling")]
        );

        session.remove_component(id.as_str()).unwrap();
        assert!(session.components().is_empty());
        assert_eq!(
            session.pages().get(page.as_str()).map(|p| p.components.len()),
            Some(0)
        );
    }

    #[test]
    fn test_list_handle_requires_list() {
        let mut session = session(json!({ "Home": {} }));
        let page = session.create_page("Home", None);
        let id = session
            .create_component(page.as_str(), &json!({ "type": "view" }))
            .unwrap();
        assert!(matches!(
            session.list(id.as_str()),
            Err(NoodlError::NotAList { .. })
        ));
    }
}
