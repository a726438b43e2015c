#![forbid(unsafe_code)]

//! Field paths and key-path splitting.
//!
//! A [`FieldPath`] addresses one registered field inside the form, e.g.
//! `["billing", "address", "street"]`. A *key path* is a field path followed
//! by one trailing property name, e.g. `["billing", "address", "street", "value"]`.
//!
//! # Invariants
//!
//! 1. [`FieldPath::joined`] is injective for paths whose segments contain no
//!    `'.'`; it is the key used by dependency maps.
//! 2. [`FieldPath::camel_joined`] is deterministic: the same segments always
//!    yield the same event-name stem.
//! 3. [`split_key_path`] never yields an empty field path.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline capacity for path segments. Form paths are rarely deeper than this.
const INLINE_SEGMENTS: usize = 4;

/// Location of a field inside the form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: SmallVec<[String; INLINE_SEGMENTS]>,
}

impl FieldPath {
    /// Build a path from its segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `self` is a (non-strict) prefix of `segments`.
    #[must_use]
    pub fn is_prefix_of(&self, segments: &[&str]) -> bool {
        self.segments.len() <= segments.len()
            && self
                .segments
                .iter()
                .zip(segments)
                .all(|(own, other)| own == other)
    }

    /// Return a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Dot-joined key, e.g. `billing.address`.
    #[must_use]
    pub fn joined(&self) -> String {
        self.segments.join(".")
    }

    /// Camel-case join of every segment, e.g. `["billing", "first_name"]`
    /// becomes `billingFirstName`.
    ///
    /// Each segment is split on non-alphanumeric characters; the first word
    /// is lower-cased at its first character, every later word is capitalized.
    #[must_use]
    pub fn camel_joined(&self) -> String {
        camelize(self.segments.iter().map(String::as_str))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<&[&str]> for FieldPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

/// Camel-join an arbitrary list of words.
///
/// Used for deterministic event names: `camelize(["a", "registered"])` is
/// `aRegistered`.
#[must_use]
pub fn camelize<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    let words = parts
        .into_iter()
        .flat_map(|part| part.split(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty());

    for word in words {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if out.is_empty() {
            out.extend(first.to_lowercase());
        } else {
            out.extend(first.to_uppercase());
        }
        out.push_str(chars.as_str());
    }
    out
}

/// Split a subscribed key path into `(target field path, target prop name)`.
///
/// Returns `None` for paths with fewer than two segments: a key path needs at
/// least one field segment plus the trailing property name.
#[must_use]
pub fn split_key_path<'a>(key_path: &[&'a str]) -> Option<(FieldPath, &'a str)> {
    match key_path {
        [] | [_] => None,
        [field @ .., prop] => Some((FieldPath::from(field), *prop)),
    }
}
