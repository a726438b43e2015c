#![forbid(unsafe_code)]

//! Field lifecycle topics and event payloads.

use std::fmt;

use crate::path::{FieldPath, camelize};
use crate::props::FieldProps;

/// Event-name suffix for field registration.
pub const REGISTERED_SUFFIX: &str = "registered";

/// Event-name suffix for property changes.
pub const PROPS_CHANGE_SUFFIX: &str = "propsChange";

/// A bus topic, keyed by the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The field at this path has just been registered with the form.
    Registered(FieldPath),
    /// One or more properties of the field at this path changed.
    PropsChanged(FieldPath),
}

impl Topic {
    /// The field this topic is about.
    #[must_use]
    pub fn field_path(&self) -> &FieldPath {
        match self {
            Self::Registered(path) | Self::PropsChanged(path) => path,
        }
    }

    /// Deterministic string form: camel-joined path plus a fixed suffix,
    /// e.g. `billingAddressRegistered`.
    #[must_use]
    pub fn event_name(&self) -> String {
        let suffix = match self {
            Self::Registered(_) => REGISTERED_SUFFIX,
            Self::PropsChanged(_) => PROPS_CHANGE_SUFFIX,
        };
        let path = self.field_path();
        camelize(path.segments().iter().map(String::as_str).chain([suffix]))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_name())
    }
}

/// Previous and next property snapshots of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct PropsChange {
    pub prev: FieldProps,
    pub next: FieldProps,
    /// Whether dependents should validate after recomputing. `None` leaves
    /// the decision to the receiver's default.
    pub should_validate: Option<bool>,
}

impl PropsChange {
    /// Change with no validation preference.
    #[must_use]
    pub fn new(prev: FieldProps, next: FieldProps) -> Self {
        Self {
            prev,
            next,
            should_validate: None,
        }
    }

    /// Builder: request (or suppress) validation of dependents.
    #[must_use]
    pub fn with_should_validate(mut self, should_validate: bool) -> Self {
        self.should_validate = Some(should_validate);
        self
    }

    /// Whether `name` differs between the two snapshots.
    ///
    /// Plain value inequality; a property appearing or disappearing counts.
    #[must_use]
    pub fn changed(&self, name: &str) -> bool {
        self.prev.get(name) != self.next.get(name)
    }
}

/// Payload delivered to bus listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    /// Props of the field that just registered.
    Registered(FieldProps),
    /// A property change of an already-registered field.
    PropsChanged(PropsChange),
}
