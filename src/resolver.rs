//! Reference resolution.
//!
//! A [`Resolver`] dereferences reference strings (see [`crate::reference`]) against a set of
//! data [`Scopes`]: the enclosing list row's data object, the current page object and the
//! root object. Chains of references are followed until a non-reference value is reached.
//! Cycles are cut off by a per-call guard; an abandoned branch resolves to `None`, exactly
//! like a path that does not exist, so one bad field never stops the rest of a tree from
//! resolving.

use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::config::Config;
use crate::reference::{is_root_key, split_path, Reference, ReferenceKind};

/// Callback answering traversal references that have no containing data object:
/// given an ascent depth (1 = parent), return that ancestor's resolved property bag.
pub type AncestorFn<'a> = &'a dyn Fn(usize) -> Option<Value>;

/// One enclosing list row: its data object and the name it is bound under
#[derive(Debug, Clone, Copy)]
pub struct RowScope<'a> {
    pub data: &'a Value,
    pub iterator_var: &'a str,
}

/// The data visible to one resolution
#[derive(Clone)]
pub struct Scopes<'a> {
    /// Enclosing list rows, nearest first
    pub rows: Vec<RowScope<'a>>,
    /// Name of the current page inside `root`
    pub root_key: Option<&'a str>,
    /// Page name → page data object
    pub root: &'a Map<String, Value>,
    pub ancestor: Option<AncestorFn<'a>>,
}

impl<'a> Scopes<'a> {
    pub fn new(root: &'a Map<String, Value>) -> Self {
        Self {
            rows: Vec::new(),
            root_key: None,
            root,
            ancestor: None,
        }
    }

    pub fn with_root_key(mut self, root_key: &'a str) -> Self {
        self.root_key = Some(root_key);
        self
    }

    /// Enter a list row nested inside every row added so far.
    pub fn with_row(mut self, data: &'a Value, iterator_var: &'a str) -> Self {
        self.rows.insert(0, RowScope { data, iterator_var });
        self
    }

    pub fn with_ancestor(mut self, ancestor: AncestorFn<'a>) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    /// The current page's data object
    pub fn page(&self) -> Option<&'a Value> {
        self.root_key.and_then(|key| self.root.get(key))
    }

    /// Data object of the nearest row
    pub fn row(&self) -> Option<&'a Value> {
        self.rows.first().map(|row| row.data)
    }

    /// Classify `raw`: prefixed forms first, then the iterator variable of each enclosing
    /// row, nearest first. The index names the row an iterator reference binds to.
    pub fn classify<'r>(&self, raw: &'r str) -> Option<(Reference<'r>, Option<usize>)> {
        if let Some(reference) = Reference::parse(raw, None) {
            return Some((reference, None));
        }
        self.rows.iter().enumerate().find_map(|(index, row)| {
            Reference::parse(raw, Some(row.iterator_var)).map(|reference| (reference, Some(index)))
        })
    }
}

/// Where a dereferenced value was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    /// Inside the data object of `Scopes::rows[index]`
    Row(usize, Vec<String>),
    /// Inside a page object of the root
    Page(String, Vec<String>),
}

/// Per-call bookkeeping for the cycle guard
struct CycleGuard {
    last: Option<String>,
    repeats: usize,
    hops: usize,
    cycle_limit: usize,
    max_hops: usize,
}

impl CycleGuard {
    fn new(cycle_limit: usize, max_hops: usize) -> Self {
        Self {
            last: None,
            repeats: 0,
            hops: 0,
            cycle_limit,
            max_hops,
        }
    }

    /// Record one more hop. Returns false once the chain must be abandoned.
    fn enter(&mut self, raw: &str) -> bool {
        self.hops += 1;
        if self.hops > self.max_hops {
            warn!(
                "Reference chain exceeded {} hops at '{}', abandoning",
                self.max_hops, raw
            );
            return false;
        }
        if self.last.as_deref() == Some(raw) {
            self.repeats += 1;
            if self.repeats > self.cycle_limit {
                warn!(
                    "Reference '{}' repeated {} times in a row, abandoning",
                    raw, self.repeats
                );
                return false;
            }
        } else {
            self.last = Some(raw.to_string());
            self.repeats = 1;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    cycle_limit: usize,
    max_hops: usize,
    uppercase_root_keys: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(&Config::default())
    }
}

impl Resolver {
    pub fn new(config: &Config) -> Self {
        Self {
            cycle_limit: config.cycle_limit.max(1),
            max_hops: config.max_reference_hops.max(1),
            uppercase_root_keys: config.uppercase_root_keys,
        }
    }

    /// Deeply resolve `value`.
    ///
    /// Strings matching the reference grammar are dereferenced; arrays and objects are
    /// walked element by element; everything else is returned unchanged. `None` means the
    /// value is undefined. Inside arrays an undefined element becomes `null`, inside
    /// objects the key is dropped.
    pub fn resolve(&self, value: &Value, scopes: &Scopes) -> Option<Value> {
        match value {
            Value::String(s) => self.resolve_str(s, scopes),
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve(item, scopes).unwrap_or(Value::Null))
                    .collect(),
            )),
            Value::Object(map) => Some(Value::Object(self.resolve_map(map, scopes))),
            scalar => Some(scalar.clone()),
        }
    }

    /// Resolve every entry of a map, dropping entries that resolve to undefined.
    pub fn resolve_map(&self, map: &Map<String, Value>, scopes: &Scopes) -> Map<String, Value> {
        map.iter()
            .filter_map(|(key, value)| self.resolve(value, scopes).map(|v| (key.clone(), v)))
            .collect()
    }

    /// Resolve a single string. Literal strings come back unchanged.
    pub fn resolve_str(&self, raw: &str, scopes: &Scopes) -> Option<Value> {
        self.locate_str(raw, scopes).map(|(value, _)| value)
    }

    /// Like [`resolve_str`](Self::resolve_str), also reporting where the final value was
    /// found. Literals and values read from an ancestor node have no location.
    pub fn locate_str(&self, raw: &str, scopes: &Scopes) -> Option<(Value, Option<DataLocation>)> {
        let mut guard = CycleGuard::new(self.cycle_limit, self.max_hops);
        let mut root_key: Option<String> = scopes.root_key.map(str::to_string);
        let mut origin: Option<DataLocation> = None;
        let mut current = raw.to_string();

        loop {
            let Some((reference, row)) = scopes.classify(&current) else {
                return Some((Value::String(current.clone()), origin));
            };
            if !guard.enter(&current) {
                return None;
            }

            let (found, found_at) =
                self.lookup(&reference, row, scopes, &mut root_key, origin.as_ref())?;
            trace!("Resolved '{}' -> {:?}", current, found);

            match found {
                Value::String(next) if scopes.classify(&next).is_some() => {
                    current = next;
                    origin = found_at;
                }
                value => return Some((value, found_at)),
            }
        }
    }

    /// Look up a bare data key such as `formData.email` or `itemObject.name`, trying the
    /// row data objects (nearest first), then the current page object, then the root
    /// object. Reference strings are resolved normally.
    pub fn resolve_data_key(&self, data_key: &str, scopes: &Scopes) -> Option<Value> {
        if scopes.classify(data_key).is_some() {
            return self.resolve_str(data_key, scopes);
        }
        let path = split_path(data_key);
        let found = scopes
            .rows
            .iter()
            .find_map(|row| get_path(row.data, &path))
            .or_else(|| scopes.page().and_then(|page| get_path(page, &path)))
            .or_else(|| get_path_in_map(scopes.root, &path))?;
        match found {
            Value::String(s) => self.resolve_str(s, scopes),
            other => Some(other.clone()),
        }
    }

    /// Find the value a single reference points at, along with where it was found.
    fn lookup(
        &self,
        reference: &Reference,
        row: Option<usize>,
        scopes: &Scopes,
        root_key: &mut Option<String>,
        origin: Option<&DataLocation>,
    ) -> Option<(Value, Option<DataLocation>)> {
        let path: Vec<&str> = reference.path.clone();
        match reference.kind {
            ReferenceKind::Iterator => {
                let index = row?;
                let found = get_path(scopes.rows.get(index)?.data, &path)?.clone();
                Some((found, Some(DataLocation::Row(index, owned(&path)))))
            }
            ReferenceKind::Root => {
                let (head, rest) = path.split_first()?;
                let page = scopes.root.get(*head)?;
                *root_key = Some(head.to_string());
                let found = get_path(page, rest)?.clone();
                Some((found, Some(DataLocation::Page(head.to_string(), owned(rest)))))
            }
            ReferenceKind::Page => {
                let (head, rest) = path.split_first()?;
                if let Some(page) = scopes.root.get(*head) {
                    *root_key = Some(head.to_string());
                    let found = get_path(page, rest)?.clone();
                    return Some((found, Some(DataLocation::Page(head.to_string(), owned(rest)))));
                }
                self.lookup_local(&path, scopes, root_key)
            }
            ReferenceKind::Local | ReferenceKind::EvalLocal => {
                self.lookup_local(&path, scopes, root_key)
            }
            ReferenceKind::Traversal { depth } => match origin {
                Some(origin) => lookup_relative(origin, depth, &path, scopes),
                None => {
                    let ancestor = scopes.ancestor?;
                    let bag = ancestor(depth)?;
                    let found = get_path(&bag, &path)?.clone();
                    Some((found, None))
                }
            },
        }
    }

    /// `..path` lookups: current page object first, then the root object when the first
    /// segment is a page name.
    fn lookup_local(
        &self,
        path: &[&str],
        scopes: &Scopes,
        root_key: &mut Option<String>,
    ) -> Option<(Value, Option<DataLocation>)> {
        let mut path = path;
        if let (Some(head), Some(key)) = (path.first(), root_key.as_deref()) {
            if *head == key {
                path = &path[1..];
            }
        }

        if let Some(key) = root_key.clone() {
            if let Some(found) = scopes.root.get(&key).and_then(|page| get_path(page, path)) {
                return Some((found.clone(), Some(DataLocation::Page(key, owned(path)))));
            }
        }

        let (head, rest) = path.split_first()?;
        if self.uppercase_root_keys && !is_root_key(head) {
            return None;
        }
        let page = scopes.root.get(*head)?;
        *root_key = Some(head.to_string());
        let found = get_path(page, rest)?.clone();
        Some((found, Some(DataLocation::Page(head.to_string(), owned(rest)))))
    }
}

/// Ascend `depth` levels from the object holding the reference, then follow `path`.
fn lookup_relative(
    origin: &DataLocation,
    depth: usize,
    path: &[&str],
    scopes: &Scopes,
) -> Option<(Value, Option<DataLocation>)> {
    let (base, held_at) = match origin {
        DataLocation::Row(index, at) => (scopes.rows.get(*index)?.data, at),
        DataLocation::Page(key, at) => (scopes.root.get(key)?, at),
    };
    let container_len = held_at.len().saturating_sub(1);
    let target_len = container_len.saturating_sub(depth);

    let mut full: Vec<&str> = held_at[..target_len].iter().map(String::as_str).collect();
    full.extend_from_slice(path);
    let found = get_path(base, &full)?.clone();

    let next_origin = match origin {
        DataLocation::Row(index, _) => DataLocation::Row(*index, owned(&full)),
        DataLocation::Page(key, _) => DataLocation::Page(key.clone(), owned(&full)),
    };
    Some((found, Some(next_origin)))
}

fn owned(path: &[&str]) -> Vec<String> {
    path.iter().map(|s| s.to_string()).collect()
}

/// Walk `path` through nested objects and arrays (numeric segments index arrays).
pub fn get_path<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Mutable counterpart of [`get_path`]
pub fn get_path_mut<'v>(value: &'v mut Value, path: &[String]) -> Option<&'v mut Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment.as_str()),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

fn get_path_in_map<'v>(map: &'v Map<String, Value>, path: &[&str]) -> Option<&'v Value> {
    let (head, rest) = path.split_first()?;
    get_path(map.get(*head)?, rest)
}
