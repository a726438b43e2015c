#![forbid(unsafe_code)]

//! Resolvable properties and the resolver invoker.
//!
//! A reactive prop is either a fixed value ([`ReactiveProp::Static`]) or a
//! user-supplied [`Resolver`] ([`ReactiveProp::Computed`]). Both are driven
//! through the same two operations: [`ReactiveProp::is_function`] and
//! [`ReactiveProp::resolve_against_fields`].
//!
//! A resolver must be deterministic in *which* paths it reads; its result
//! may be produced later ([`Resolved::Deferred`]).

use std::fmt;
use std::rc::Rc;

use fieldwire_core::FieldProps;
use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;

use super::subscribe::TracingContext;
use crate::error::ResolveError;
use crate::form::FormContext;

/// Inputs a resolver receives.
pub struct ResolverArgs<'a> {
    /// Field-state reader (records dependencies during analysis).
    pub subscribe: &'a TracingContext<'a>,
    /// Props of the field that owns the reactive prop, as captured when the
    /// prop was wired. Recomputations reuse this snapshot; read the owner's
    /// live props through `subscribe` instead. The delegated validation
    /// policy is the exception: it checks the owner's current value in the
    /// form's tree.
    pub field_props: &'a FieldProps,
    /// Ambient form configuration.
    pub form: &'a FormContext,
}

impl ResolverArgs<'_> {
    /// Shorthand for `self.subscribe.read(key_path)`.
    pub fn get(&self, key_path: &[&str]) -> Option<Value> {
        self.subscribe.read(key_path)
    }
}

/// A resolver's result: available now, or later.
pub enum Resolved {
    Ready(Value),
    Deferred(LocalBoxFuture<'static, Result<Value, ResolveError>>),
}

impl Resolved {
    /// Wrap a future result.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, ResolveError>> + 'static,
    {
        Self::Deferred(future.boxed_local())
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Wait for the value.
    pub async fn settle(self) -> Result<Value, ResolveError> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Deferred(future) => future.await,
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}

type ResolverFn = dyn Fn(&ResolverArgs<'_>) -> Result<Resolved, ResolveError>;

/// User-supplied derivation function. Cloning shares the function.
#[derive(Clone)]
pub struct Resolver {
    func: Rc<ResolverFn>,
}

impl Resolver {
    /// Resolver that may fail or defer its result.
    pub fn new(func: impl Fn(&ResolverArgs<'_>) -> Result<Resolved, ResolveError> + 'static) -> Self {
        Self { func: Rc::new(func) }
    }

    /// Resolver that always produces a value synchronously.
    pub fn from_fn(func: impl Fn(&ResolverArgs<'_>) -> Value + 'static) -> Self {
        Self::new(move |args| Ok(Resolved::Ready(func(args))))
    }

    /// Invoke once with `subscribe`, the owner's props and the form context.
    ///
    /// No retries and no recovery: a failure is returned to the caller.
    pub fn invoke(
        &self,
        subscribe: &TracingContext<'_>,
        field_props: &FieldProps,
        form: &FormContext,
    ) -> Result<Resolved, ResolveError> {
        let args = ResolverArgs {
            subscribe,
            field_props,
            form,
        };
        (self.func)(&args)
    }

    /// Whether two handles share the same function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

/// A reactive property declaration.
#[derive(Debug, Clone)]
pub enum ReactiveProp {
    /// Fixed value; never re-resolved.
    Static(Value),
    /// Value derived from other fields.
    Computed(Resolver),
}

impl ReactiveProp {
    /// Whether the prop is backed by a resolver.
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    /// Produce the prop's value against the snapshot behind `subscribe`.
    pub fn resolve_against_fields(
        &self,
        subscribe: &TracingContext<'_>,
        field_props: &FieldProps,
        form: &FormContext,
    ) -> Result<Resolved, ResolveError> {
        match self {
            Self::Static(value) => Ok(Resolved::Ready(value.clone())),
            Self::Computed(resolver) => resolver.invoke(subscribe, field_props, form),
        }
    }
}

impl From<Resolver> for ReactiveProp {
    fn from(resolver: Resolver) -> Self {
        Self::Computed(resolver)
    }
}

impl From<Value> for ReactiveProp {
    fn from(value: Value) -> Self {
        Self::Static(value)
    }
}
