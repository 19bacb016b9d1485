//! Stores of live component nodes and pages.
//!
//! Both caches publish `add` / `remove` / `clear` hooks so a rendering layer can keep its
//! own presentation state in step with what is cached here.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::emitter::{Emitter, ListenerId};
use crate::node::{ComponentId, ComponentNode};
use crate::page::{Page, PageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    Add,
    Remove,
    Clear,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEvent::Add => "add",
            CacheEvent::Remove => "remove",
            CacheEvent::Clear => "clear",
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook payload: the affected id, or `None` for `clear`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEventPayload<I> {
    pub id: Option<I>,
}

/// id → live component node
#[derive(Debug, Default)]
pub struct ComponentCache {
    nodes: HashMap<ComponentId, ComponentNode>,
    events: Emitter<CacheEvent, CacheEventPayload<ComponentId>>,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: ComponentNode) {
        let id = node.id().clone();
        if self.nodes.insert(id.clone(), node).is_some() {
            debug!("Replaced cached component '{}'", id);
        }
        self.events
            .emit(&CacheEvent::Add, &CacheEventPayload { id: Some(id) });
    }

    pub fn get(&self, id: &str) -> Option<&ComponentNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ComponentNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// The whole store
    pub fn all(&self) -> &HashMap<ComponentId, ComponentNode> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, predicate: impl Fn(&ComponentNode) -> bool) -> Vec<&ComponentNode> {
        self.nodes.values().filter(|node| predicate(node)).collect()
    }

    pub fn remove(&mut self, id: &str) -> Option<ComponentNode> {
        let node = self.nodes.remove(id)?;
        self.events.emit(
            &CacheEvent::Remove,
            &CacheEventPayload {
                id: Some(node.id().clone()),
            },
        );
        Some(node)
    }

    /// Remove a node and every descendant, children first. Returns the removed ids.
    pub fn remove_subtree(&mut self, id: &str) -> Vec<ComponentId> {
        let mut removed = Vec::new();
        let children = match self.nodes.get(id) {
            Some(node) => node.children().to_vec(),
            None => return removed,
        };
        for child in children {
            removed.extend(self.remove_subtree(child.as_str()));
        }
        if let Some(node) = self.remove(id) {
            removed.push(node.id().clone());
        }
        removed
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.events
            .emit(&CacheEvent::Clear, &CacheEventPayload { id: None });
    }

    pub fn on(
        &mut self,
        event: CacheEvent,
        callback: impl FnMut(&CacheEventPayload<ComponentId>) + 'static,
    ) -> ListenerId {
        self.events.on(event, callback)
    }

    pub fn off(&mut self, event: CacheEvent, id: ListenerId) -> bool {
        self.events.off(&event, id)
    }
}

/// id → page
#[derive(Debug, Default)]
pub struct PageCache {
    pages: HashMap<PageId, Page>,
    events: Emitter<CacheEvent, CacheEventPayload<PageId>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, page: Page) {
        let id = page.id.clone();
        self.pages.insert(id.clone(), page);
        self.events
            .emit(&CacheEvent::Add, &CacheEventPayload { id: Some(id) });
    }

    pub fn get(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.get_mut(id)
    }

    pub fn all(&self) -> &HashMap<PageId, Page> {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn remove(&mut self, id: &str) -> Option<Page> {
        let page = self.pages.remove(id)?;
        self.events.emit(
            &CacheEvent::Remove,
            &CacheEventPayload {
                id: Some(page.id.clone()),
            },
        );
        Some(page)
    }

    /// Drop every page, emptying their component lists first.
    pub fn clear(&mut self) {
        for page in self.pages.values_mut() {
            page.components.clear();
        }
        self.pages.clear();
        self.events
            .emit(&CacheEvent::Clear, &CacheEventPayload { id: None });
    }

    pub fn on(
        &mut self,
        event: CacheEvent,
        callback: impl FnMut(&CacheEventPayload<PageId>) + 'static,
    ) -> ListenerId {
        self.events.on(event, callback)
    }

    pub fn off(&mut self, event: CacheEvent, id: ListenerId) -> bool {
        self.events.off(&event, id)
    }
}
