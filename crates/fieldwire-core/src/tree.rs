#![forbid(unsafe_code)]

//! Immutable field-state snapshots.
//!
//! # Design
//!
//! [`FieldTree`] maps every registered [`FieldPath`] to that field's
//! [`FieldProps`]. The map lives behind an `Rc`, so cloning a tree is O(1)
//! and every "update" ([`with_field`](FieldTree::with_field),
//! [`without_field`](FieldTree::without_field)) produces a new snapshot,
//! copying the map only when the snapshot is shared.
//!
//! # Invariants
//!
//! 1. No method mutates a tree observable through another clone.
//! 2. Iteration order is registration order.
//! 3. [`get_in`](FieldTree::get_in) resolves the longest registered field
//!    path that prefixes the key path.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::path::FieldPath;
use crate::props::FieldProps;

/// Path-addressable snapshot of all registered fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    fields: Rc<IndexMap<FieldPath, FieldProps>>,
}

impl FieldTree {
    /// Empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a field is registered at `path`.
    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.fields.contains_key(path)
    }

    /// Property snapshot of the field at `path`.
    #[must_use]
    pub fn field(&self, path: &FieldPath) -> Option<&FieldProps> {
        self.fields.get(path)
    }

    /// New snapshot with the field at `path` replaced (or added).
    #[must_use]
    pub fn with_field(&self, path: FieldPath, props: FieldProps) -> Self {
        let mut next = self.clone();
        Rc::make_mut(&mut next.fields).insert(path, props);
        next
    }

    /// New snapshot without the field at `path`.
    #[must_use]
    pub fn without_field(&self, path: &FieldPath) -> Self {
        if !self.contains(path) {
            return self.clone();
        }
        let mut next = self.clone();
        Rc::make_mut(&mut next.fields).shift_remove(path);
        next
    }

    /// Look up a value by key path.
    ///
    /// The longest registered field path that prefixes `key_path` is chosen;
    /// remaining segments descend into that field's property values (objects
    /// by key, arrays by index). A key path that names a field exactly yields
    /// the flattened props of that field.
    #[must_use]
    pub fn get_in(&self, key_path: &[&str]) -> Option<Value> {
        let (path, props) = self.owning_field(key_path)?;
        let rest = &key_path[path.len()..];
        let Some((first, deeper)) = rest.split_first() else {
            return Some(props.to_value());
        };
        let mut current = props.get(first)?;
        for segment in deeper {
            current = match current {
                Value::Object(map) => map.get(*segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// The registered field that [`get_in`](Self::get_in) serves `key_path`
    /// from: the longest non-empty field path prefixing it.
    #[must_use]
    pub fn owning_field(&self, key_path: &[&str]) -> Option<(&FieldPath, &FieldProps)> {
        self.fields
            .iter()
            .filter(|(path, _)| !path.is_empty() && path.is_prefix_of(key_path))
            .max_by_key(|(path, _)| path.len())
    }

    /// Registered field paths in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.fields.keys()
    }

    /// Iterate `(path, props)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &FieldProps)> {
        self.fields.iter()
    }

    /// Number of registered fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldProps> for FieldTree {
    fn from_iter<I: IntoIterator<Item = FieldProps>>(iter: I) -> Self {
        let fields = iter
            .into_iter()
            .map(|props| (props.field_path().clone(), props))
            .collect();
        Self {
            fields: Rc::new(fields),
        }
    }
}
