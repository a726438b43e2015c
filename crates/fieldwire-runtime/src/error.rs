#![forbid(unsafe_code)]

//! Error and diagnostic types for the reactive engine.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Invalid key path | `subscribe` called with < 2 segments | [`Diagnostic`], path ignored |
//! | Unknown target prop | prop not declared on a registered target | [`Diagnostic`], still tracked |
//! | Resolver failure | resolver returned `Err` or its deferred result failed | [`PipelineError`] to the error sink |
//! | Write-back failure | `update_field` / `validate_field` rejected | [`PipelineError`] to the error sink |
//!
//! Diagnostics never stop a pipeline. Pipeline errors stop only the pipeline
//! they occur in.

use std::fmt;

use fieldwire_core::FieldPath;

/// Failure raised by a user-supplied resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    message: String,
}

impl ResolveError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resolver failed: {}", self.message)
    }
}

impl std::error::Error for ResolveError {}

impl From<String> for ResolveError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ResolveError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure reported by the form container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The addressed field is not registered.
    UnknownField(FieldPath),
    /// The container refused the request.
    Rejected(String),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField(path) => write!(f, "unknown field '{path}'"),
            Self::Rejected(msg) => write!(f, "form rejected request: {msg}"),
        }
    }
}

impl std::error::Error for FormError {}

/// Non-fatal finding recorded while tracing a resolver's reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `subscribe` was called with fewer than two segments.
    InvalidKeyPath { key_path: Vec<String> },
    /// The target field is registered but does not declare the property.
    UnknownTargetProp { target: FieldPath, prop: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyPath { key_path } => write!(
                f,
                "invalid key path [{}]: expected a field path and a property name",
                key_path.join(", ")
            ),
            Self::UnknownTargetProp { target, prop } => {
                write!(f, "field '{target}' does not declare property '{prop}'")
            }
        }
    }
}

/// Step of a reactive pipeline at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Running the resolver under dependency tracing.
    Analyze,
    /// Invoking the resolver or awaiting its deferred result.
    Resolve,
    /// Writing the derived value back through `update_field`.
    Update,
    /// Running `validate_field` after the write-back.
    Validate,
    /// Handing the pipeline to the executor.
    Spawn,
}

impl PipelineStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Resolve => "resolve",
            Self::Update => "update",
            Self::Validate => "validate",
            Self::Spawn => "spawn",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause of a [`PipelineError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCause {
    Resolve(ResolveError),
    Form(FormError),
    Spawn(String),
}

impl fmt::Display for PipelineCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve(err) => fmt::Display::fmt(err, f),
            Self::Form(err) => fmt::Display::fmt(err, f),
            Self::Spawn(msg) => write!(f, "executor refused task: {msg}"),
        }
    }
}

/// A failed reactive pipeline (one reactive prop, optionally one target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    pub subscriber: FieldPath,
    pub reactive_prop: String,
    /// Target field whose change triggered the pipeline; `None` for the
    /// initial push.
    pub target: Option<FieldPath>,
    pub stage: PipelineStage,
    pub cause: PipelineCause,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reactive prop '{}' of '{}' failed at {}",
            self.reactive_prop, self.subscriber, self.stage
        )?;
        if let Some(target) = &self.target {
            write!(f, " (target '{target}')")?;
        }
        write!(f, ": {}", self.cause)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            PipelineCause::Resolve(err) => Some(err),
            PipelineCause::Form(err) => Some(err),
            PipelineCause::Spawn(_) => None,
        }
    }
}
