#![forbid(unsafe_code)]

//! Per-field property mappings.
//!
//! [`FieldProps`] is the property snapshot of one field: its [`FieldPath`],
//! the name of the property that holds the field's user value, and an
//! insertion-ordered map of property name to JSON value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::FieldPath;

/// Property that holds a field's user value unless the field says otherwise.
pub const DEFAULT_VALUE_PROP: &str = "value";

/// Property snapshot of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProps {
    field_path: FieldPath,
    value_prop_name: String,
    props: IndexMap<String, Value>,
}

impl FieldProps {
    /// Create an empty property set for the field at `field_path`.
    #[must_use]
    pub fn new(field_path: impl Into<FieldPath>) -> Self {
        Self {
            field_path: field_path.into(),
            value_prop_name: DEFAULT_VALUE_PROP.to_string(),
            props: IndexMap::new(),
        }
    }

    /// Builder: set one property.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder: designate which property holds the field's user value
    /// (e.g. `"checked"` for checkboxes).
    #[must_use]
    pub fn with_value_prop(mut self, name: impl Into<String>) -> Self {
        self.value_prop_name = name.into();
        self
    }

    /// The field's location.
    #[must_use]
    pub fn field_path(&self) -> &FieldPath {
        &self.field_path
    }

    /// Name of the property holding the field's user value.
    #[must_use]
    pub fn value_prop_name(&self) -> &str {
        &self.value_prop_name
    }

    /// The field's user value, if set.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.props.get(&self.value_prop_name)
    }

    /// Look up one property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// Whether the field declares `name` among its properties.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    /// Set one property, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.props.insert(name.into(), value.into())
    }

    /// Apply a partial update. Existing keys keep their position.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (name, value) in patch {
            self.props.insert(name.clone(), value.clone());
        }
    }

    /// Return a copy with `patch` applied.
    #[must_use]
    pub fn merged(&self, patch: &Map<String, Value>) -> Self {
        let mut next = self.clone();
        next.merge(patch);
        next
    }

    /// Iterate properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Declared property names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.props.len()
    }

    /// Whether no property is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Flatten to a plain JSON object. The object also carries `fieldPath`
    /// (as an array of segments) unless a property of that name exists.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map: Map<String, Value> = self
            .props
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !map.contains_key("fieldPath") {
            let segments = self
                .field_path
                .segments()
                .iter()
                .cloned()
                .map(Value::String)
                .collect();
            map.insert("fieldPath".to_string(), Value::Array(segments));
        }
        Value::Object(map)
    }
}

/// Whether a property value counts as "empty".
///
/// Absent, `null`, `""`, `[]` and `{}` are empty. `false` and `0` are values.
#[must_use]
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_) | Value::Number(_)) => false,
    }
}
