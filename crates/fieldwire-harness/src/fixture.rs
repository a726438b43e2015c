#![forbid(unsafe_code)]

//! One form, one engine, one local executor.

use std::cell::RefCell;
use std::rc::Rc;

use fieldwire_core::{FieldPath, FieldProps};
use fieldwire_runtime::{EngineConfig, FieldBindings, FormHandle, PipelineError, ReactiveEngine, ReactiveField};
use futures::executor::LocalPool;
use serde_json::Value;

use crate::form::MemoryForm;

/// Test fixture driving a [`ReactiveEngine`] over a [`MemoryForm`].
///
/// Pipeline failures are collected instead of logged; read them with
/// [`errors`](Self::errors). Nothing runs until [`settle`](Self::settle).
pub struct FormFixture {
    pool: LocalPool,
    form: Rc<MemoryForm>,
    engine: ReactiveEngine,
    errors: Rc<RefCell<Vec<PipelineError>>>,
}

impl FormFixture {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_form(MemoryForm::new(), config)
    }

    #[must_use]
    pub fn with_form(form: MemoryForm, config: EngineConfig) -> Self {
        let pool = LocalPool::new();
        let form = Rc::new(form);
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        let engine = ReactiveEngine::with_config(Rc::clone(&form) as Rc<dyn FormHandle>, pool.spawner(), config)
            .with_error_sink(move |err| sink.borrow_mut().push(err.clone()));
        Self {
            pool,
            form,
            engine,
            errors,
        }
    }

    #[must_use]
    pub fn form(&self) -> &Rc<MemoryForm> {
        &self.form
    }

    #[must_use]
    pub fn engine(&self) -> &ReactiveEngine {
        &self.engine
    }

    /// Register a plain field (no reactive props).
    pub fn register(&self, props: FieldProps) -> usize {
        self.form.register(props)
    }

    /// Register `field` and wire its reactive props against the tree as it
    /// stands after registration.
    pub fn mount(&self, field: &ReactiveField) -> FieldBindings {
        self.form.register(field.props().clone());
        self.engine.run(field, &self.form.fields())
    }

    /// Set one prop of a registered field.
    ///
    /// # Panics
    ///
    /// Panics if the field is not registered.
    pub fn set(&self, path: &FieldPath, name: &str, value: impl Into<Value>) {
        if let Err(err) = self.form.set_prop(path, name, value) {
            panic!("set {path}.{name}: {err}");
        }
    }

    /// Run every spawned pipeline until none can make progress.
    pub fn settle(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Current value of one prop of one field.
    #[must_use]
    pub fn prop(&self, path: &FieldPath, name: &str) -> Option<Value> {
        self.form.prop(path, name)
    }

    /// Pipeline failures reported so far.
    #[must_use]
    pub fn errors(&self) -> Vec<PipelineError> {
        self.errors.borrow().clone()
    }
}

impl Default for FormFixture {
    fn default() -> Self {
        Self::new()
    }
}
