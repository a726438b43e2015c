#![forbid(unsafe_code)]

//! Change observers: live re-resolution when a target field changes.
//!
//! # Design
//!
//! A [`ChangeObserver`] owns exactly one bus listener on
//! [`Topic::PropsChanged`] for its target field. The listener is gated by
//! an equality predicate over the tracked props only: the event qualifies
//! when at least one tracked prop differs between the previous and next
//! snapshot. A qualifying event triggers one recomputation, however many
//! tracked props changed.
//!
//! A recomputation runs strictly in sequence:
//!
//! 1. derive a new field tree with the target's next props,
//! 2. re-run the resolver (lookup only, no tracing) against it,
//! 3. await the result,
//! 4. `update_field` the subscriber with the new value,
//! 5. `validate_field` the subscriber, if requested.
//!
//! # Failure Modes
//!
//! - **Resolver or write-back failure**: reported to the engine's error
//!   sink; the observer stays live for the next change.
//! - **Teardown during a recomputation**: the in-flight run completes;
//!   later events are no longer observed.

use std::fmt;
use std::rc::{Rc, Weak};

use fieldwire_core::{FieldEvent, FieldPath, FieldProps, PropsChange, Subscription, Topic};
use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;

use super::pipeline::{Derivation, EngineCore};
use super::subscribe::TracingContext;
use crate::error::{PipelineCause, PipelineError, PipelineStage};
use crate::form::{FieldUpdate, ValidateRequest};

struct ObserverShared {
    core: Rc<EngineCore>,
    derivation: Rc<Derivation>,
    target: FieldPath,
    props: Vec<String>,
}

impl ObserverShared {
    /// Tracked props that changed, with their next values.
    fn changed<'c>(&self, change: &'c PropsChange) -> Vec<(&str, Option<&'c Value>)> {
        self.props
            .iter()
            .filter(|name| change.changed(name))
            .map(|name| (name.as_str(), change.next.get(name)))
            .collect()
    }

    fn on_change(self: &Rc<Self>, change: &PropsChange) {
        let changed = self.changed(change);
        if changed.is_empty() {
            tracing::trace!(
                target_field = %self.target,
                subscriber = %self.derivation.subscriber_path(),
                "change ignored: no tracked prop differs"
            );
            return;
        }
        let should_validate = change
            .should_validate
            .unwrap_or(self.core.config.validate_on_change);
        tracing::debug!(
            target_field = %self.target,
            subscriber = %self.derivation.subscriber_path(),
            reactive_prop = %self.derivation.name,
            changed = ?changed,
            should_validate,
            "tracked props changed"
        );
        let work = recompute(Rc::clone(self), change.next.clone(), should_validate);
        self.core
            .spawn_isolated(&self.derivation, Some(&self.target), work);
    }

    fn error(&self, stage: PipelineStage, cause: PipelineCause) -> PipelineError {
        self.derivation.error(Some(&self.target), stage, cause)
    }
}

async fn recompute(
    shared: Rc<ObserverShared>,
    next_target: FieldProps,
    should_validate: bool,
) -> Result<(), PipelineError> {
    let form = &shared.core.form;
    let derivation = &shared.derivation;
    let fields = form.fields().with_field(shared.target.clone(), next_target);
    let context = form.context();

    let resolved = {
        let subscribe = TracingContext::lookup(&fields);
        derivation
            .prop
            .resolve_against_fields(&subscribe, &derivation.subscriber, &context)
    }
    .map_err(|err| shared.error(PipelineStage::Resolve, PipelineCause::Resolve(err)))?;
    let next_value = resolved
        .settle()
        .await
        .map_err(|err| shared.error(PipelineStage::Resolve, PipelineCause::Resolve(err)))?;

    let field_path = derivation.subscriber_path().clone();
    let field_props = form
        .update_field(FieldUpdate::single(
            field_path.clone(),
            derivation.name.clone(),
            next_value,
        ))
        .await
        .map_err(|err| shared.error(PipelineStage::Update, PipelineCause::Form(err)))?;

    if should_validate {
        let force = shared.core.config.force_validation;
        form.validate_field(ValidateRequest {
            force,
            field_path,
            field_props,
            force_props: force,
            fields,
        })
        .await
        .map_err(|err| shared.error(PipelineStage::Validate, PipelineCause::Form(err)))?;
    }

    tracing::trace!(
        target_field = %shared.target,
        subscriber = %derivation.subscriber_path(),
        reactive_prop = %derivation.name,
        "recomputation written back"
    );
    Ok(())
}

/// Live subscription re-resolving one reactive prop when tracked props of
/// one target field change.
pub struct ChangeObserver {
    shared: Rc<ObserverShared>,
    subscription: Subscription,
}

impl ChangeObserver {
    pub(crate) fn observe(
        core: &Rc<EngineCore>,
        derivation: &Rc<Derivation>,
        target: FieldPath,
        props: Vec<String>,
    ) -> Self {
        let shared = Rc::new(ObserverShared {
            core: Rc::clone(core),
            derivation: Rc::clone(derivation),
            target: target.clone(),
            props,
        });
        let weak: Weak<ObserverShared> = Rc::downgrade(&shared);
        let subscription = core
            .form
            .events()
            .subscribe(Topic::PropsChanged(target), move |event| {
                let FieldEvent::PropsChanged(change) = event else {
                    return;
                };
                if let Some(shared) = weak.upgrade() {
                    shared.on_change(change);
                }
            });
        tracing::debug!(
            target_field = %shared.target,
            props = ?shared.props,
            subscriber = %derivation.subscriber_path(),
            reactive_prop = %derivation.name,
            "change observer wired"
        );
        Self {
            shared,
            subscription,
        }
    }

    /// Run one recomputation now, as if the target had changed to
    /// `next_target`, bypassing the change predicate.
    pub fn deliver(
        &self,
        next_target: FieldProps,
        should_validate: bool,
    ) -> LocalBoxFuture<'static, Result<(), PipelineError>> {
        recompute(Rc::clone(&self.shared), next_target, should_validate).boxed_local()
    }

    /// Field whose changes are observed.
    #[must_use]
    pub fn target(&self) -> &FieldPath {
        &self.shared.target
    }

    /// Props of the target that gate recomputation.
    #[must_use]
    pub fn tracked_props(&self) -> &[String] {
        &self.shared.props
    }

    /// Name of the reactive prop this observer maintains.
    #[must_use]
    pub fn reactive_prop(&self) -> &str {
        &self.shared.derivation.name
    }

    /// Whether change events are still observed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop observing. In-flight recomputations are not cancelled.
    pub fn teardown(self) {
        self.subscription.unsubscribe();
    }
}

impl fmt::Debug for ChangeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeObserver")
            .field("target", &self.shared.target)
            .field("props", &self.shared.props)
            .field("reactive_prop", &self.shared.derivation.name)
            .field("active", &self.is_active())
            .finish()
    }
}
