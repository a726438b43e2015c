#![forbid(unsafe_code)]

//! The subscription orchestrator.
//!
//! [`ReactiveEngine::run`] is called once per field at registration time.
//! For each reactive prop it analyzes dependencies, pushes the initial value
//! into the field, and wires every discovered target: directly with a
//! [`ChangeObserver`] when the target is registered, through a
//! [`DelegatedBinding`] when it is not.
//!
//! # Invariants
//!
//! 1. Wiring is synchronous: when `run` returns, every observer and
//!    delegated listener exists.
//! 2. The initial value is pushed for every reactive prop whose analysis
//!    succeeds, whether or not it has dependencies.
//! 3. A failure in one reactive prop (analysis, resolution, write-back)
//!    never prevents the others from being wired or updated.

use std::fmt;
use std::rc::Rc;

use fieldwire_core::{FieldPath, FieldProps, FieldTree};
use futures::task::LocalSpawn;

use super::analyzer::{Analysis, analyze};
use super::delegate::DelegatedBinding;
use super::field::ReactiveField;
use super::observer::ChangeObserver;
use super::pipeline::{Derivation, EngineCore, ErrorSink, log_error_sink};
use super::resolver::{ReactiveProp, Resolved};
use crate::config::EngineConfig;
use crate::error::{PipelineCause, PipelineError, PipelineStage, ResolveError};
use crate::form::{FieldUpdate, FormHandle};

/// Handle for one wired dependency of one reactive prop.
#[derive(Debug)]
pub enum Binding {
    /// Target was registered; changes are observed.
    Observing(ChangeObserver),
    /// Target was missing; waiting for it to register.
    Delegated(DelegatedBinding),
}

impl Binding {
    #[must_use]
    pub fn target(&self) -> &FieldPath {
        match self {
            Self::Observing(observer) => observer.target(),
            Self::Delegated(binding) => binding.target(),
        }
    }

    #[must_use]
    pub fn reactive_prop(&self) -> &str {
        match self {
            Self::Observing(observer) => observer.reactive_prop(),
            Self::Delegated(binding) => binding.reactive_prop(),
        }
    }

    /// Whether the binding is a delegated one still awaiting registration.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Delegated(binding) if binding.is_pending())
    }

    /// Tear the binding down.
    pub fn teardown(self) {
        match self {
            Self::Observing(observer) => observer.teardown(),
            Self::Delegated(binding) => binding.teardown(),
        }
    }
}

/// Every binding created for one subscriber field.
///
/// Dropping the set (e.g. when the field unmounts) removes every listener.
#[derive(Debug)]
pub struct FieldBindings {
    subscriber: FieldPath,
    bindings: Vec<Binding>,
}

impl FieldBindings {
    fn new(subscriber: FieldPath) -> Self {
        Self {
            subscriber,
            bindings: Vec::new(),
        }
    }

    #[must_use]
    pub fn subscriber(&self) -> &FieldPath {
        &self.subscriber
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Change observers created directly (targets registered at wiring time).
    pub fn observers(&self) -> impl Iterator<Item = &ChangeObserver> {
        self.bindings.iter().filter_map(|binding| match binding {
            Binding::Observing(observer) => Some(observer),
            Binding::Delegated(_) => None,
        })
    }

    /// Delegated bindings, pending or promoted.
    pub fn delegated(&self) -> impl Iterator<Item = &DelegatedBinding> {
        self.bindings.iter().filter_map(|binding| match binding {
            Binding::Delegated(delegated) => Some(delegated),
            Binding::Observing(_) => None,
        })
    }

    /// Bindings for one reactive prop.
    pub fn for_prop<'a>(&'a self, reactive_prop: &'a str) -> impl Iterator<Item = &'a Binding> {
        self.bindings
            .iter()
            .filter(move |binding| binding.reactive_prop() == reactive_prop)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_pending()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Tear down every binding.
    pub fn teardown(self) {
        for binding in self.bindings {
            binding.teardown();
        }
    }
}

/// Reactive field-dependency engine bound to one form.
pub struct ReactiveEngine {
    core: Rc<EngineCore>,
}

impl ReactiveEngine {
    /// Engine with the default [`EngineConfig`].
    pub fn new(form: Rc<dyn FormHandle>, spawner: impl LocalSpawn + 'static) -> Self {
        Self::with_config(form, spawner, EngineConfig::default())
    }

    pub fn with_config(
        form: Rc<dyn FormHandle>,
        spawner: impl LocalSpawn + 'static,
        config: EngineConfig,
    ) -> Self {
        Self {
            core: Rc::new(EngineCore {
                form,
                spawner: Rc::new(spawner),
                config,
                error_sink: std::cell::RefCell::new(log_error_sink()),
            }),
        }
    }

    /// Replace the sink that receives pipeline failures (default: logged at
    /// error level).
    #[must_use]
    pub fn with_error_sink(self, sink: impl Fn(&PipelineError) + 'static) -> Self {
        let sink: ErrorSink = Rc::new(sink);
        *self.core.error_sink.borrow_mut() = sink;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// Trace one resolver run against `tree` (see [`analyze`]).
    pub fn analyze(
        &self,
        reactive_prop: &str,
        prop: &ReactiveProp,
        subscriber: &FieldProps,
        tree: &FieldTree,
    ) -> Result<Analysis, ResolveError> {
        analyze(reactive_prop, prop, subscriber, tree, &self.core.form.context())
    }

    /// Observe `props` of `target` and keep `reactive_prop` of `subscriber`
    /// up to date.
    pub fn observe(
        &self,
        target: FieldPath,
        props: Vec<String>,
        reactive_prop: &str,
        prop: ReactiveProp,
        subscriber: FieldProps,
    ) -> ChangeObserver {
        let derivation = self.derivation(reactive_prop, prop, subscriber);
        ChangeObserver::observe(&self.core, &derivation, target, props)
    }

    /// Wait for `target` to register, then observe it.
    pub fn delegate(
        &self,
        target: FieldPath,
        reactive_prop: &str,
        prop: ReactiveProp,
        subscriber: FieldProps,
    ) -> DelegatedBinding {
        let derivation = self.derivation(reactive_prop, prop, subscriber);
        DelegatedBinding::bind(&self.core, &derivation, target)
    }

    fn derivation(&self, name: &str, prop: ReactiveProp, subscriber: FieldProps) -> Rc<Derivation> {
        Rc::new(Derivation {
            subscriber,
            name: name.to_string(),
            prop,
        })
    }

    /// Wire every reactive prop of `subscriber` against `tree`.
    pub fn run(&self, subscriber: &ReactiveField, tree: &FieldTree) -> FieldBindings {
        let mut bindings = FieldBindings::new(subscriber.field_path().clone());
        if !subscriber.has_reactive_props() {
            return bindings;
        }

        let _span = tracing::debug_span!("run", subscriber = %subscriber.field_path()).entered();
        let context = self.core.form.context();
        for (name, prop) in subscriber.reactive_props() {
            let derivation = self.derivation(name, prop.clone(), subscriber.props().clone());

            let analysis = match analyze(name, prop, subscriber.props(), tree, &context) {
                Ok(analysis) => analysis,
                Err(err) => {
                    self.core.report(&derivation.error(
                        None,
                        PipelineStage::Analyze,
                        PipelineCause::Resolve(err),
                    ));
                    continue;
                }
            };

            self.push_initial(&derivation, analysis.initial);

            if analysis.dependencies.is_empty() {
                tracing::debug!(reactive_prop = name, "no dependencies; value is static");
                continue;
            }

            for deps in &analysis.dependencies {
                let binding = if tree.contains(&deps.target) {
                    Binding::Observing(ChangeObserver::observe(
                        &self.core,
                        &derivation,
                        deps.target.clone(),
                        deps.props.clone(),
                    ))
                } else {
                    Binding::Delegated(DelegatedBinding::bind(
                        &self.core,
                        &derivation,
                        deps.target.clone(),
                    ))
                };
                bindings.bindings.push(binding);
            }
        }
        bindings
    }

    fn push_initial(&self, derivation: &Rc<Derivation>, initial: Resolved) {
        let form = Rc::clone(&self.core.form);
        let owned = Rc::clone(derivation);
        let work = async move {
            let value = initial.settle().await.map_err(|err| {
                owned.error(None, PipelineStage::Resolve, PipelineCause::Resolve(err))
            })?;
            form.update_field(FieldUpdate::single(
                owned.subscriber_path().clone(),
                owned.name.clone(),
                value,
            ))
            .await
            .map_err(|err| owned.error(None, PipelineStage::Update, PipelineCause::Form(err)))?;
            Ok(())
        };
        self.core.spawn_isolated(derivation, None, work);
    }
}

impl fmt::Debug for ReactiveEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEngine")
            .field("config", &self.core.config)
            .finish_non_exhaustive()
    }
}
