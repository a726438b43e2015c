#![forbid(unsafe_code)]

//! Runtime: the reactive field-dependency engine.
//!
//! # Role in fieldwire
//! A field may declare reactive props: values computed by a resolver from
//! other fields' props. `fieldwire-runtime` discovers which fields and props
//! a resolver reads, keeps the derived value current as those props change,
//! and defers wiring for fields that have not registered yet.
//!
//! # Primary responsibilities
//! - **Analysis**: one traced resolver run yields a [`DependencyMap`].
//! - **Observation**: [`ChangeObserver`] re-resolves when a tracked prop
//!   changes and writes the result back through the [`FormHandle`].
//! - **Delegation**: [`DelegatedBinding`] waits for a missing target and
//!   promotes itself to an observer exactly once.
//! - **Isolation**: failures reach the [`ErrorSink`] and stop only the
//!   pipeline they occur in.
//!
//! # Example
//! ```ignore
//! let engine = ReactiveEngine::new(form.clone(), pool.spawner());
//! let field = ReactiveField::new(FieldProps::new(["b"]))
//!     .with_reactive("required", Resolver::from_fn(|args| {
//!         json!(!is_empty_value(args.get(&["a", "value"]).as_ref()))
//!     }));
//! let bindings = engine.run(&field, &form.fields());
//! ```

pub mod config;
pub mod error;
pub mod form;
pub mod reactive;

pub use config::{DelegatedValidation, EngineConfig};
pub use error::{Diagnostic, FormError, PipelineCause, PipelineError, PipelineStage, ResolveError};
pub use form::{FieldUpdate, FormContext, FormHandle, ValidateRequest};
pub use reactive::{
    Analysis, Binding, ChangeObserver, DelegatedBinding, DependencyMap, ErrorSink, FieldBindings,
    ReactiveEngine, ReactiveField, ReactiveProp, Resolved, Resolver, ResolverArgs, TargetDeps,
    TracingContext, analyze, log_error_sink,
};
