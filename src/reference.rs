//! Reference string grammar.
//!
//! | Prefix      | Kind        | Scope                                          |
//! |-------------|-------------|------------------------------------------------|
//! | `=.Key.a`   | `Root`      | root object                                    |
//! | `=..a`      | `EvalLocal` | current page object                            |
//! | `.Key.a`    | `Page`      | page `Key` of the root object                  |
//! | `..a`       | `Local`     | current page object (root if `a` is a root key)|
//! | `__.a`      | `Traversal` | ancestor, one level per underscore             |
//! | `item.a`    | `Iterator`  | data object of the enclosing list row          |
//!
//! The single-dot form only applies when `Key` starts with an uppercase letter.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Root,
    EvalLocal,
    Page,
    Local,
    Traversal { depth: usize },
    Iterator,
}

impl ReferenceKind {
    /// Whether the reference is looked up against the current page object
    pub fn is_local(&self) -> bool {
        matches!(self, ReferenceKind::Local | ReferenceKind::EvalLocal)
    }

    /// Whether the reference names its page explicitly
    pub fn is_root(&self) -> bool {
        matches!(self, ReferenceKind::Root | ReferenceKind::Page)
    }
}

/// A classified reference string, borrowed from the value it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub raw: &'a str,
    pub kind: ReferenceKind,
    pub path: Vec<&'a str>,
}

fn prefixed_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<prefix>=\.\.|=\.|\.\.|\.|_+\.)(?P<path>[A-Za-z_$][^\s]*)$").unwrap()
    })
}

impl<'a> Reference<'a> {
    /// Classify `raw`. Returns `None` for literal strings.
    ///
    /// `iterator_var` is the binding name of the enclosing list, if any; a bare path starting
    /// with it is a reference into the current row's data object.
    pub fn parse(raw: &'a str, iterator_var: Option<&str>) -> Option<Reference<'a>> {
        if let Some(caps) = prefixed_reference_regex().captures(raw) {
            let prefix = caps.name("prefix")?.as_str();
            let path = caps.name("path")?.as_str();
            // `.com`, `.js` and the like are text, not page references
            if prefix == "." && !is_root_key(path) {
                return None;
            }
            let kind = match prefix {
                "=.." => ReferenceKind::EvalLocal,
                "=." => ReferenceKind::Root,
                ".." => ReferenceKind::Local,
                "." => ReferenceKind::Page,
                underscores => ReferenceKind::Traversal {
                    depth: underscores.len() - 1,
                },
            };
            return Some(Reference {
                raw,
                kind,
                path: split_path(path),
            });
        }

        let iterator_var = iterator_var.filter(|v| !v.is_empty())?;
        if raw == iterator_var {
            return Some(Reference {
                raw,
                kind: ReferenceKind::Iterator,
                path: Vec::new(),
            });
        }
        let rest = raw.strip_prefix(iterator_var)?.strip_prefix('.')?;
        Some(Reference {
            raw,
            kind: ReferenceKind::Iterator,
            path: split_path(rest),
        })
    }

    /// First path segment, if any
    pub fn head(&self) -> Option<&'a str> {
        self.path.first().copied()
    }
}

/// Whether `value` would be dereferenced rather than used literally.
pub fn is_reference(value: &str, iterator_var: Option<&str>) -> bool {
    Reference::parse(value, iterator_var).is_some()
}

/// Whether a path segment looks like a page name (uppercase first letter).
pub fn is_root_key(segment: &str) -> bool {
    segment
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
}

/// Split a dotted path, dropping empty segments left by doubled dots.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}
