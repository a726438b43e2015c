#![forbid(unsafe_code)]

//! The form container, as seen by the engine.
//!
//! The engine never owns form state. It reads the current [`FieldTree`],
//! listens on the form's [`EventBus`], and writes derived values back
//! through [`FormHandle::update_field`] / [`FormHandle::validate_field`].

use std::fmt;
use std::rc::Rc;

use fieldwire_core::{EventBus, FieldPath, FieldProps, FieldTree};
use futures::future::LocalBoxFuture;
use serde_json::{Map, Value};

use crate::error::FormError;

/// Ambient, read-only configuration handed to every resolver.
///
/// Opaque to the engine; cloning shares the same value.
#[derive(Clone, Default, PartialEq)]
pub struct FormContext {
    value: Rc<Value>,
}

impl FormContext {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value: Rc::new(value),
        }
    }

    /// Top-level entry of an object context.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// The whole context value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Debug for FormContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FormContext").field(&self.value).finish()
    }
}

/// Partial property update for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field_path: FieldPath,
    pub props_patch: Map<String, Value>,
}

impl FieldUpdate {
    /// Patch setting a single property.
    #[must_use]
    pub fn single(field_path: FieldPath, name: impl Into<String>, value: Value) -> Self {
        let mut props_patch = Map::new();
        props_patch.insert(name.into(), value);
        Self {
            field_path,
            props_patch,
        }
    }
}

/// Validation request for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateRequest {
    /// Bypass debounce.
    pub force: bool,
    pub field_path: FieldPath,
    pub field_props: FieldProps,
    /// Bypass "props unchanged" short-circuits.
    pub force_props: bool,
    /// Field-state snapshot the validation should run against.
    pub fields: FieldTree,
}

/// Operations the engine needs from a form container.
///
/// Implementations are single-threaded; returned futures run on the
/// engine's local executor.
pub trait FormHandle {
    /// Current field-state snapshot.
    fn fields(&self) -> FieldTree;

    /// Ambient context passed to resolvers.
    fn context(&self) -> FormContext;

    /// Bus carrying registration and property-change events.
    fn events(&self) -> EventBus;

    /// Apply a partial update to one field; resolves to the field's props
    /// after the update. Must tolerate identical repeated patches.
    fn update_field(&self, update: FieldUpdate) -> LocalBoxFuture<'static, Result<FieldProps, FormError>>;

    /// Validate one field.
    fn validate_field(&self, request: ValidateRequest) -> LocalBoxFuture<'static, Result<(), FormError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_patch() {
        let update = FieldUpdate::single(FieldPath::from(["b"]), "label", json!("X"));
        assert_eq!(update.props_patch.get("label"), Some(&json!("X")));
        assert_eq!(update.props_patch.len(), 1);
    }

    #[test]
    fn context_lookup() {
        let context = FormContext::new(json!({ "locale": "en" }));
        assert_eq!(context.get("locale"), Some(&json!("en")));
        assert_eq!(context.clone(), context);
        assert_eq!(FormContext::default().as_value(), &Value::Null);
    }
}
