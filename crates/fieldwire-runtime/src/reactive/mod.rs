#![forbid(unsafe_code)]

//! Reactive props: dependency tracing, change observers, delegated bindings.
//!
//! # Lifecycle
//!
//! ```text
//! run(field, tree)
//!   └─ per reactive prop
//!        ├─ analyze ───────────────► initial value ─► update_field
//!        └─ per target read
//!             ├─ registered ──► ChangeObserver (propsChange)
//!             └─ missing ─────► DelegatedBinding (registered, once)
//!                                   └─ on registration ─► ChangeObserver
//! ```

pub mod analyzer;
pub mod delegate;
pub mod engine;
pub mod field;
pub mod observer;
mod pipeline;
pub mod resolver;
pub mod subscribe;

pub use analyzer::{Analysis, analyze};
pub use delegate::DelegatedBinding;
pub use engine::{Binding, FieldBindings, ReactiveEngine};
pub use field::ReactiveField;
pub use observer::ChangeObserver;
pub use pipeline::{ErrorSink, log_error_sink};
pub use resolver::{ReactiveProp, Resolved, Resolver, ResolverArgs};
pub use subscribe::{DependencyMap, TargetDeps, TracingContext};
