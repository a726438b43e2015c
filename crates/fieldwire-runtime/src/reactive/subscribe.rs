#![forbid(unsafe_code)]

//! The tracing subscriber: field-state reads that record dependencies.
//!
//! # Design
//!
//! A resolver reads other fields through [`TracingContext::read`]. In
//! *tracking* mode (dependency analysis) every valid read is also recorded
//! into an owned [`DependencyMap`]; in *lookup* mode (live recomputation)
//! reads are plain lookups, since dependencies are already wired.
//!
//! The accumulator lives inside the context and is handed back explicitly
//! through [`TracingContext::into_dependencies`]; nothing is captured by
//! closures behind the resolver's back.
//!
//! # Invariants
//!
//! 1. A key path shorter than two segments is never recorded. In tracking
//!    mode such a read returns `None` and yields a diagnostic.
//! 2. The recorded target is the field the read is served from: the longest
//!    registered field path prefixing the key path, with the next segment as
//!    the prop. With no such field, the key path splits before its last
//!    segment.
//! 3. A property name appears at most once per target in the map, and
//!    distinct field paths are distinct targets.
//! 4. Reading a property a registered target does not declare yields a
//!    diagnostic but is still recorded.
//! 5. Lookup mode never records and never emits diagnostics.

use std::cell::RefCell;

use fieldwire_core::{FieldPath, FieldTree, split_key_path};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Diagnostic;

/// Props a resolver reads from one target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDeps {
    pub target: FieldPath,
    pub props: Vec<String>,
}

/// Target field → props read from it, in first-read order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap {
    targets: IndexMap<FieldPath, TargetDeps>,
}

impl DependencyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `prop` of `target`. Returns `false` if it was already recorded.
    pub fn record(&mut self, target: &FieldPath, prop: &str) -> bool {
        let entry = self
            .targets
            .entry(target.clone())
            .or_insert_with(|| TargetDeps {
                target: target.clone(),
                props: Vec::new(),
            });
        if entry.props.iter().any(|p| p == prop) {
            return false;
        }
        entry.props.push(prop.to_string());
        true
    }

    /// Props recorded for `target`.
    #[must_use]
    pub fn props_for(&self, target: &FieldPath) -> Option<&[String]> {
        self.targets.get(target).map(|d| d.props.as_slice())
    }

    /// Target whose dot-joined path is `key`. Segments containing dots make
    /// this ambiguous; the first match in read order wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TargetDeps> {
        self.targets.values().find(|d| d.target.joined() == key)
    }

    /// Iterate targets in first-read order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetDeps> {
        self.targets.values()
    }

    /// Dot-joined target paths in first-read order, for display.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.targets.keys().map(FieldPath::joined)
    }

    /// Number of distinct targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<'a> IntoIterator for &'a DependencyMap {
    type Item = &'a TargetDeps;
    type IntoIter = indexmap::map::Values<'a, FieldPath, TargetDeps>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.values()
    }
}

#[derive(Debug, Default)]
struct Recorder {
    dependencies: DependencyMap,
    diagnostics: Vec<Diagnostic>,
}

/// Field-state reader handed to resolvers as `subscribe`.
#[derive(Debug)]
pub struct TracingContext<'a> {
    tree: &'a FieldTree,
    recorder: Option<RefCell<Recorder>>,
}

impl<'a> TracingContext<'a> {
    /// Reader that records every valid read as a dependency.
    #[must_use]
    pub fn tracking(tree: &'a FieldTree) -> Self {
        Self {
            tree,
            recorder: Some(RefCell::new(Recorder::default())),
        }
    }

    /// Reader that only looks values up.
    #[must_use]
    pub fn lookup(tree: &'a FieldTree) -> Self {
        Self {
            tree,
            recorder: None,
        }
    }

    /// Whether reads are being recorded.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.recorder.is_some()
    }

    /// The snapshot reads are served from.
    #[must_use]
    pub fn tree(&self) -> &FieldTree {
        self.tree
    }

    /// Read the value at `key_path` (field path segments followed by a
    /// property name), recording the dependency when tracking.
    pub fn read(&self, key_path: &[&str]) -> Option<Value> {
        if let Some(recorder) = &self.recorder {
            if !self.guard(recorder, key_path) {
                return None;
            }
        }
        self.tree.get_in(key_path)
    }

    /// Validate and record one read. Returns `false` to reject it.
    fn guard(&self, recorder: &RefCell<Recorder>, key_path: &[&str]) -> bool {
        let Some((target, prop)) = self.target_of(key_path) else {
            let diagnostic = Diagnostic::InvalidKeyPath {
                key_path: key_path.iter().map(|s| (*s).to_string()).collect(),
            };
            tracing::warn!(key_path = ?key_path, "{diagnostic}");
            recorder.borrow_mut().diagnostics.push(diagnostic);
            return false;
        };

        let mut recorder = recorder.borrow_mut();
        if let Some(field) = self.tree.field(&target) {
            if !field.declares(prop) {
                let diagnostic = Diagnostic::UnknownTargetProp {
                    target: target.clone(),
                    prop: prop.to_string(),
                };
                tracing::warn!(target_field = %target, prop, "{diagnostic}");
                recorder.diagnostics.push(diagnostic);
            }
        }
        if recorder.dependencies.record(&target, prop) {
            tracing::trace!(target_field = %target, prop, "dependency recorded");
        }
        true
    }

    /// Split `key_path` into the field it is served from and the prop read.
    fn target_of<'k>(&self, key_path: &[&'k str]) -> Option<(FieldPath, &'k str)> {
        if key_path.len() < 2 {
            return None;
        }
        match self.tree.owning_field(key_path) {
            Some((path, _)) if path.len() < key_path.len() => {
                Some((path.clone(), key_path[path.len()]))
            }
            _ => split_key_path(key_path),
        }
    }

    /// Dependencies recorded so far (empty in lookup mode).
    #[must_use]
    pub fn recorded_dependencies(&self) -> DependencyMap {
        self.recorder
            .as_ref()
            .map(|r| r.borrow().dependencies.clone())
            .unwrap_or_default()
    }

    /// Diagnostics raised so far (empty in lookup mode).
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.recorder
            .as_ref()
            .map(|r| r.borrow().diagnostics.clone())
            .unwrap_or_default()
    }

    /// Consume the context, returning recorded dependencies and diagnostics.
    #[must_use]
    pub fn into_parts(self) -> (DependencyMap, Vec<Diagnostic>) {
        match self.recorder {
            Some(recorder) => {
                let Recorder {
                    dependencies,
                    diagnostics,
                } = recorder.into_inner();
                (dependencies, diagnostics)
            }
            None => (DependencyMap::default(), Vec::new()),
        }
    }

    /// Consume the context, returning recorded dependencies.
    #[must_use]
    pub fn into_dependencies(self) -> DependencyMap {
        self.into_parts().0
    }
}
