use std::fmt;

use crate::node::ComponentId;
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        PageId(id.into())
    }

    pub fn generate() -> Self {
        PageId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for PageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        PageId::new(id)
    }
}

/// A rendered page: its own viewport plus the top-level components built for it
#[derive(Debug, Clone)]
pub struct Page {
    pub id: PageId,
    /// Key of this page's data object in the root object
    pub page_name: String,
    pub viewport: Viewport,
    pub components: Vec<ComponentId>,
}

impl Page {
    pub fn new(id: PageId, page_name: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            id,
            page_name: page_name.into(),
            viewport,
            components: Vec::new(),
        }
    }
}
