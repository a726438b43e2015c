#![forbid(unsafe_code)]

//! In-memory form container.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use fieldwire_core::{EventBus, FieldEvent, FieldPath, FieldProps, FieldTree, PropsChange, Topic};
use fieldwire_runtime::{FieldUpdate, FormContext, FormError, FormHandle, ValidateRequest};
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::{Map, Value};

#[derive(Default)]
struct FormState {
    fields: FieldTree,
    updates: Vec<FieldUpdate>,
    validations: Vec<ValidateRequest>,
    reject_updates: HashSet<FieldPath>,
    reject_validations: HashSet<FieldPath>,
}

/// A [`FormHandle`] backed by a plain [`FieldTree`].
///
/// Every write goes through the bus the way a real container's would:
/// [`register`](Self::register) emits `registered`, and both
/// [`change`](Self::change) and engine write-backs emit `propsChange`.
/// Write-backs and validation requests are recorded for inspection.
#[derive(Default)]
pub struct MemoryForm {
    state: RefCell<FormState>,
    bus: EventBus,
    context: FormContext,
}

impl MemoryForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Form whose resolvers see `context` as the ambient form value.
    #[must_use]
    pub fn with_context(context: Value) -> Self {
        Self {
            context: FormContext::new(context),
            ..Self::default()
        }
    }

    /// Add `props` to the tree, then announce the registration.
    ///
    /// Returns the number of listeners notified.
    pub fn register(&self, props: FieldProps) -> usize {
        let path = props.field_path().clone();
        {
            let mut state = self.state.borrow_mut();
            state.fields = state.fields.with_field(path.clone(), props.clone());
        }
        tracing::debug!(field = %path, "field registered");
        self.bus
            .emit(&Topic::Registered(path), &FieldEvent::Registered(props))
    }

    /// Remove a field from the tree. No event is emitted.
    pub fn unregister(&self, path: &FieldPath) -> Option<FieldProps> {
        let mut state = self.state.borrow_mut();
        let removed = state.fields.field(path).cloned();
        state.fields = state.fields.without_field(path);
        removed
    }

    /// Apply `patch` to a registered field as a user edit would, then
    /// announce the change.
    ///
    /// Returns the number of listeners notified.
    pub fn change(
        &self,
        path: &FieldPath,
        patch: Map<String, Value>,
        should_validate: Option<bool>,
    ) -> Result<usize, FormError> {
        let mut change = self.apply(path, &patch)?;
        change.should_validate = should_validate;
        Ok(self.announce(change))
    }

    /// Set one prop. Shorthand for [`change`](Self::change) with a
    /// single-entry patch and no validation preference.
    pub fn set_prop(
        &self,
        path: &FieldPath,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<usize, FormError> {
        let mut patch = Map::new();
        patch.insert(name.to_string(), value.into());
        self.change(path, patch, None)
    }

    fn apply(&self, path: &FieldPath, patch: &Map<String, Value>) -> Result<PropsChange, FormError> {
        let mut state = self.state.borrow_mut();
        let prev = state
            .fields
            .field(path)
            .cloned()
            .ok_or_else(|| FormError::UnknownField(path.clone()))?;
        let next = prev.merged(patch);
        state.fields = state.fields.with_field(path.clone(), next.clone());
        Ok(PropsChange::new(prev, next))
    }

    fn announce(&self, change: PropsChange) -> usize {
        let topic = Topic::PropsChanged(change.next.field_path().clone());
        self.bus.emit(&topic, &FieldEvent::PropsChanged(change))
    }

    /// Current props of one field.
    #[must_use]
    pub fn field(&self, path: &FieldPath) -> Option<FieldProps> {
        self.state.borrow().fields.field(path).cloned()
    }

    /// Current value of one prop of one field.
    #[must_use]
    pub fn prop(&self, path: &FieldPath, name: &str) -> Option<Value> {
        self.state
            .borrow()
            .fields
            .field(path)
            .and_then(|props| props.get(name).cloned())
    }

    /// Write-backs received through [`FormHandle::update_field`], in order.
    #[must_use]
    pub fn updates(&self) -> Vec<FieldUpdate> {
        self.state.borrow().updates.clone()
    }

    /// Write-backs that touched `name` on `path`, in order.
    #[must_use]
    pub fn updates_of(&self, path: &FieldPath, name: &str) -> Vec<Value> {
        self.state
            .borrow()
            .updates
            .iter()
            .filter(|update| &update.field_path == path)
            .filter_map(|update| update.props_patch.get(name).cloned())
            .collect()
    }

    /// Validation requests received, in order.
    #[must_use]
    pub fn validations(&self) -> Vec<ValidateRequest> {
        self.state.borrow().validations.clone()
    }

    /// Forget recorded write-backs and validation requests.
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.updates.clear();
        state.validations.clear();
    }

    /// Make every later write-back to `path` fail.
    pub fn reject_updates_for(&self, path: FieldPath) {
        self.state.borrow_mut().reject_updates.insert(path);
    }

    /// Make every later validation of `path` fail.
    pub fn reject_validations_for(&self, path: FieldPath) {
        self.state.borrow_mut().reject_validations.insert(path);
    }

    fn write_back(&self, update: FieldUpdate) -> Result<FieldProps, FormError> {
        if self.state.borrow().reject_updates.contains(&update.field_path) {
            return Err(FormError::Rejected(format!(
                "update of '{}' rejected",
                update.field_path
            )));
        }
        let change = self.apply(&update.field_path, &update.props_patch)?;
        self.state.borrow_mut().updates.push(update);
        let next = change.next.clone();
        self.announce(change);
        Ok(next)
    }
}

impl FormHandle for MemoryForm {
    fn fields(&self) -> FieldTree {
        self.state.borrow().fields.clone()
    }

    fn context(&self) -> FormContext {
        self.context.clone()
    }

    fn events(&self) -> EventBus {
        self.bus.clone()
    }

    fn update_field(&self, update: FieldUpdate) -> LocalBoxFuture<'static, Result<FieldProps, FormError>> {
        future::ready(self.write_back(update)).boxed_local()
    }

    fn validate_field(&self, request: ValidateRequest) -> LocalBoxFuture<'static, Result<(), FormError>> {
        let mut state = self.state.borrow_mut();
        let rejected = state.reject_validations.contains(&request.field_path);
        let result = if rejected {
            Err(FormError::Rejected(format!(
                "validation of '{}' failed",
                request.field_path
            )))
        } else {
            Ok(())
        };
        state.validations.push(request);
        future::ready(result).boxed_local()
    }
}

impl fmt::Debug for MemoryForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryForm")
            .field("fields", &state.fields.len())
            .field("updates", &state.updates.len())
            .field("validations", &state.validations.len())
            .field("bus", &self.bus)
            .finish()
    }
}
