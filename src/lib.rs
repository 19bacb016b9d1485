//! # NOODL UI resolver
//!
//! Turns declarative NOODL component specifications into live component trees.
//!
//! ## Features
//! - Reference strings (`..key`, `.Page.key`, `=.Page.key`, `__.key`, `itemObject.key`)
//!   dereferenced against the page, root and list-row data, with a per-call cycle guard
//! - Lists that keep one row node per data object, with lifecycle events
//! - Style normalization: viewport-relative sizes, flex layout, border presets, colors
//! - Component and page caches with add/remove/clear hooks
//!
//! ## Example
//! ```ignore
//! use noodl_ui::{parse_component, parse_root, Config, Session};
//!
//! let root = parse_root("Home:\n  title: Welcome\n")?;
//! let mut session = Session::new(Config::default(), root);
//! let page = session.create_page("Home", None);
//!
//! let spec = parse_component("type: label\ntext: ..title\nstyle:\n  width: \"0.5\"\n")?;
//! let id = session.create_component(page.as_str(), &spec)?;
//! let label = session.component(id.as_str()).unwrap();
//! assert_eq!(label.get("text"), Some("Welcome".into()));
//! ```

pub mod blueprint;
pub mod cache;
pub mod config;
pub mod emitter;
pub mod error;
pub mod list;
pub mod node;
pub mod page;
pub mod parser;
pub mod reference;
pub mod resolver;
pub mod session;
pub mod style;
pub mod viewport;

// --- Core types ---
pub use blueprint::Blueprint;
pub use cache::{CacheEvent, CacheEventPayload, ComponentCache, PageCache};
pub use config::{Config, ViewportSettings};
pub use emitter::{Emitter, ListenerId};
pub use error::{ListError, NoodlError, NoodlResult};
pub use list::{DataSelector, ListController, ListResult};
pub use node::{
    data_ref, ComponentId, ComponentNode, DataRef, ListSource, ListState, NodeEvent,
    NodeEventPayload, NodeKind, RowState,
};
pub use page::{Page, PageId};
pub use reference::{Reference, ReferenceKind};
pub use resolver::{DataLocation, Resolver, RowScope, Scopes};
pub use session::Session;
pub use style::{format_color, normalize_style, StyleNormalizer};
pub use viewport::{Dimension, Viewport};

use serde_json::{Map, Value};

/// Parse one component specification from YAML
pub fn parse_component(yaml: &str) -> NoodlResult<Value> {
    parser::parse_component(yaml)
}

/// Parse one component specification from JSON
pub fn parse_component_json(json: &str) -> NoodlResult<Value> {
    parser::parse_component_json(json)
}

/// Parse a page object from YAML
pub fn parse_page(yaml: &str) -> NoodlResult<Map<String, Value>> {
    parser::parse_page(yaml)
}

/// Parse a root object (page name → page object) from YAML
pub fn parse_root(yaml: &str) -> NoodlResult<Map<String, Value>> {
    parser::parse_root(yaml)
}
