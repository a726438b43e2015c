#![forbid(unsafe_code)]

//! Field declarations carrying reactive props.

use fieldwire_core::{FieldPath, FieldProps};
use indexmap::IndexMap;

use super::resolver::ReactiveProp;

/// A field's props together with its reactive prop declarations.
#[derive(Debug, Clone)]
pub struct ReactiveField {
    props: FieldProps,
    reactive_props: IndexMap<String, ReactiveProp>,
}

impl ReactiveField {
    #[must_use]
    pub fn new(props: FieldProps) -> Self {
        Self {
            props,
            reactive_props: IndexMap::new(),
        }
    }

    /// Builder: declare a reactive prop. Redeclaring a name replaces it.
    #[must_use]
    pub fn with_reactive(mut self, name: impl Into<String>, prop: impl Into<ReactiveProp>) -> Self {
        self.reactive_props.insert(name.into(), prop.into());
        self
    }

    #[must_use]
    pub fn props(&self) -> &FieldProps {
        &self.props
    }

    #[must_use]
    pub fn field_path(&self) -> &FieldPath {
        self.props.field_path()
    }

    /// Reactive props in declaration order.
    pub fn reactive_props(&self) -> impl Iterator<Item = (&str, &ReactiveProp)> {
        self.reactive_props.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn has_reactive_props(&self) -> bool {
        !self.reactive_props.is_empty()
    }
}

impl From<FieldProps> for ReactiveField {
    fn from(props: FieldProps) -> Self {
        Self::new(props)
    }
}
