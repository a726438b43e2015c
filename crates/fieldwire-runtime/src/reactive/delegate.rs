#![forbid(unsafe_code)]

//! Delegated bindings: dependencies on fields that are not registered yet.
//!
//! # Design
//!
//! A [`DelegatedBinding`] listens once on [`Topic::Registered`] for its
//! target. When the target registers, the bus drops the listener before the
//! callback runs, so promotion happens at most once. The callback then:
//!
//! 1. re-analyzes the resolver against the form's current tree,
//! 2. takes the props recorded for this target (possibly none, which yields
//!    an inert observer),
//! 3. decides whether to validate per [`DelegatedValidation`],
//! 4. wires a [`ChangeObserver`] and feeds it the registered field's props.
//!
//! Steps 1–4 run synchronously inside the callback; only the delivered
//! recomputation is asynchronous.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use fieldwire_core::{FieldEvent, FieldPath, FieldProps, FieldTree, Subscription, Topic, is_empty_value};

use super::analyzer::analyze;
use super::observer::ChangeObserver;
use super::pipeline::{Derivation, EngineCore};
use crate::config::DelegatedValidation;
use crate::error::{PipelineCause, PipelineStage};

struct DelegateShared {
    core: Rc<EngineCore>,
    derivation: Rc<Derivation>,
    target: FieldPath,
    promoted: RefCell<Option<ChangeObserver>>,
}

impl DelegateShared {
    fn promote(&self, registered: &FieldProps) {
        let derivation = &self.derivation;
        tracing::debug!(
            target_field = %self.target,
            subscriber = %derivation.subscriber_path(),
            reactive_prop = %derivation.name,
            "delegated target registered"
        );

        let fields = self.core.form.fields();
        let analysis = match analyze(
            &derivation.name,
            &derivation.prop,
            &derivation.subscriber,
            &fields,
            &self.core.form.context(),
        ) {
            Ok(analysis) => analysis,
            Err(err) => {
                self.core.report(&derivation.error(
                    Some(&self.target),
                    PipelineStage::Analyze,
                    PipelineCause::Resolve(err),
                ));
                return;
            }
        };
        let props = analysis
            .dependencies
            .props_for(&self.target)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        if props.is_empty() {
            tracing::debug!(
                target_field = %self.target,
                "resolver no longer reads the delegated target; observer is inert"
            );
        }

        let should_validate = self.should_validate(&fields);
        let observer = ChangeObserver::observe(&self.core, derivation, self.target.clone(), props);
        let delivery = observer.deliver(registered.clone(), should_validate);
        *self.promoted.borrow_mut() = Some(observer);
        self.core
            .spawn_isolated(derivation, Some(&self.target), delivery);
    }

    fn should_validate(&self, fields: &FieldTree) -> bool {
        match self.core.config.delegated_validation {
            DelegatedValidation::Always => true,
            DelegatedValidation::Never => false,
            DelegatedValidation::WhenSubscriberHasValue => {
                let captured = &self.derivation.subscriber;
                let current = fields.field(captured.field_path()).unwrap_or(captured);
                !is_empty_value(current.value())
            }
        }
    }
}

/// Placeholder for a dependency whose target field is not registered yet.
pub struct DelegatedBinding {
    shared: Rc<DelegateShared>,
    registration: Subscription,
}

impl DelegatedBinding {
    pub(crate) fn bind(
        core: &Rc<EngineCore>,
        derivation: &Rc<Derivation>,
        target: FieldPath,
    ) -> Self {
        let shared = Rc::new(DelegateShared {
            core: Rc::clone(core),
            derivation: Rc::clone(derivation),
            target: target.clone(),
            promoted: RefCell::new(None),
        });
        let topic = Topic::Registered(target);
        tracing::debug!(
            event = %topic,
            subscriber = %derivation.subscriber_path(),
            reactive_prop = %derivation.name,
            "delegated binding armed"
        );
        let weak: Weak<DelegateShared> = Rc::downgrade(&shared);
        let registration = core.form.events().subscribe_once(topic, move |event| {
            let FieldEvent::Registered(registered) = event else {
                return;
            };
            if let Some(shared) = weak.upgrade() {
                shared.promote(registered);
            }
        });
        Self {
            shared,
            registration,
        }
    }

    /// Field this binding waits for.
    #[must_use]
    pub fn target(&self) -> &FieldPath {
        &self.shared.target
    }

    /// Name of the reactive prop this binding maintains.
    #[must_use]
    pub fn reactive_prop(&self) -> &str {
        &self.shared.derivation.name
    }

    /// Still waiting for the target's registration.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.registration.is_active()
    }

    /// The target registered and a change observer took over.
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        self.shared.promoted.borrow().is_some()
    }

    /// Props tracked by the promoted observer, if promoted.
    #[must_use]
    pub fn tracked_props(&self) -> Option<Vec<String>> {
        self.shared
            .promoted
            .borrow()
            .as_ref()
            .map(|observer| observer.tracked_props().to_vec())
    }

    /// Whether the promoted observer is still live.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.shared
            .promoted
            .borrow()
            .as_ref()
            .is_some_and(ChangeObserver::is_active)
    }

    /// Drop the registration listener and any promoted observer.
    pub fn teardown(self) {
        self.registration.unsubscribe();
        if let Some(observer) = self.shared.promoted.borrow_mut().take() {
            observer.teardown();
        }
    }
}

impl fmt::Debug for DelegatedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedBinding")
            .field("target", &self.shared.target)
            .field("reactive_prop", &self.shared.derivation.name)
            .field("pending", &self.is_pending())
            .field("promoted", &self.is_promoted())
            .finish()
    }
}
