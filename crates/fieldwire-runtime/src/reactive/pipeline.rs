#![forbid(unsafe_code)]

//! Shared engine state and the per-pipeline failure boundary.
//!
//! Every asynchronous unit of work (an initial push, one reaction to a
//! change, one delegated promotion) is spawned through
//! [`EngineCore::spawn_isolated`]. A failing unit is converted into a
//! [`PipelineError`] and handed to the error sink; it never reaches the
//! executor or any sibling pipeline.

use std::cell::RefCell;
use std::rc::Rc;

use fieldwire_core::{FieldPath, FieldProps};
use futures::task::{LocalSpawn, LocalSpawnExt};

use super::resolver::ReactiveProp;
use crate::config::EngineConfig;
use crate::error::{PipelineCause, PipelineError, PipelineStage};
use crate::form::FormHandle;

/// Callback receiving every pipeline failure.
pub type ErrorSink = Rc<dyn Fn(&PipelineError)>;

/// Sink used when the host installs none: logs at error level.
pub fn log_error_sink() -> ErrorSink {
    Rc::new(|err: &PipelineError| {
        tracing::error!(
            subscriber = %err.subscriber,
            reactive_prop = %err.reactive_prop,
            target_field = ?err.target,
            stage = %err.stage,
            "{err}"
        );
    })
}

/// One reactive prop of one subscriber field, as captured at wiring time.
#[derive(Debug)]
pub(crate) struct Derivation {
    pub subscriber: FieldProps,
    pub name: String,
    pub prop: ReactiveProp,
}

impl Derivation {
    pub fn subscriber_path(&self) -> &FieldPath {
        self.subscriber.field_path()
    }

    pub fn error(
        &self,
        target: Option<&FieldPath>,
        stage: PipelineStage,
        cause: PipelineCause,
    ) -> PipelineError {
        PipelineError {
            subscriber: self.subscriber_path().clone(),
            reactive_prop: self.name.clone(),
            target: target.cloned(),
            stage,
            cause,
        }
    }
}

pub(crate) struct EngineCore {
    pub form: Rc<dyn FormHandle>,
    pub spawner: Rc<dyn LocalSpawn>,
    pub config: EngineConfig,
    pub error_sink: RefCell<ErrorSink>,
}

impl EngineCore {
    pub fn report(&self, err: &PipelineError) {
        let sink = Rc::clone(&self.error_sink.borrow());
        sink(err);
    }

    /// Run `work` on the executor inside its own failure boundary.
    pub fn spawn_isolated<F>(self: &Rc<Self>, derivation: &Derivation, target: Option<&FieldPath>, work: F)
    where
        F: Future<Output = Result<(), PipelineError>> + 'static,
    {
        let core = Rc::clone(self);
        let task = async move {
            if let Err(err) = work.await {
                core.report(&err);
            }
        };
        if let Err(spawn_err) = self.spawner.spawn_local(task) {
            self.report(&derivation.error(
                target,
                PipelineStage::Spawn,
                PipelineCause::Spawn(spawn_err.to_string()),
            ));
        }
    }
}
