#![forbid(unsafe_code)]

//! Dependency analysis: one traced resolver run.

use fieldwire_core::{FieldProps, FieldTree};

use super::resolver::{ReactiveProp, Resolved};
use super::subscribe::{DependencyMap, TracingContext};
use crate::error::{Diagnostic, ResolveError};
use crate::form::FormContext;

/// Outcome of one traced resolver run.
#[derive(Debug)]
pub struct Analysis {
    /// Target fields and props the resolver read.
    pub dependencies: DependencyMap,
    /// The resolver's result against the analyzed snapshot.
    pub initial: Resolved,
    /// Non-fatal findings from the traced reads.
    pub diagnostics: Vec<Diagnostic>,
}

/// Run `prop` once against `tree` with dependency tracing enabled.
///
/// Each call starts from an empty dependency map, so repeated calls against
/// the same snapshot return the same map.
pub fn analyze(
    reactive_prop: &str,
    prop: &ReactiveProp,
    subscriber: &FieldProps,
    tree: &FieldTree,
    form: &FormContext,
) -> Result<Analysis, ResolveError> {
    let _span = tracing::debug_span!(
        "analyze",
        subscriber = %subscriber.field_path(),
        reactive_prop
    )
    .entered();

    let subscribe = TracingContext::tracking(tree);
    let initial = prop.resolve_against_fields(&subscribe, subscriber, form)?;
    let (dependencies, diagnostics) = subscribe.into_parts();

    tracing::debug!(
        targets = dependencies.len(),
        diagnostics = diagnostics.len(),
        "dependency analysis complete"
    );
    Ok(Analysis {
        dependencies,
        initial,
        diagnostics,
    })
}
