//! Canonical error and result types for dispatch.
//!
//! Modules report failures as [`ModuleError`]. The processor collects them
//! into a single [`DispatchError`] so callers see every cause from one
//! `handle` call.

use std::{fmt, io};

use thiserror::Error;

use crate::{
    lifecycle::LifecycleError,
    payload::PayloadError,
    resend::RecordError,
};

/// Failure raised by a single module while handling an action.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A nested dispatch (for example a resubmission) failed.
    #[error("resubmission failed: {0}")]
    Dispatch(#[from] Box<DispatchError>),
    /// Filesystem or transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A durable resend record could not be encoded or decoded.
    #[error("resend record error: {0}")]
    Record(#[from] RecordError),
    /// A start or stop transition was rejected.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
    /// An inbound payload could not be read.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
    /// Free-form failure reported by a module.
    #[error("{0}")]
    Message(String),
}

impl ModuleError {
    /// Build a free-form module error.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self { Self::Message(message.into()) }
}

impl From<DispatchError> for ModuleError {
    fn from(error: DispatchError) -> Self { Self::Dispatch(Box::new(error)) }
}

/// A module failure captured during fan-out.
#[derive(Debug)]
pub struct ModuleFailure {
    /// Name of the module that failed.
    pub module: String,
    /// The error it raised.
    pub error: ModuleError,
}

impl fmt::Display for ModuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.module, self.error)
    }
}

/// Errors surfaced by [`crate::processor::Processor::handle`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered module accepted the action.
    #[error("no module handles action `{action}`")]
    NoHandlerFound {
        /// The action that went unhandled.
        action: String,
    },
    /// One or more matching modules failed. Every matching module still ran.
    #[error(
        "{count} module(s) failed handling `{action}`: {summary}",
        count = .failures.len(),
        summary = summarize(.failures)
    )]
    Failed {
        /// The dispatched action.
        action: String,
        /// Every collected cause, in registration order.
        failures: Vec<ModuleFailure>,
    },
}

impl DispatchError {
    /// Return the collected module failures, empty for `NoHandlerFound`.
    #[must_use]
    pub fn failures(&self) -> &[ModuleFailure] {
        match self {
            Self::Failed { failures, .. } => failures,
            Self::NoHandlerFound { .. } => &[],
        }
    }

    /// Returns true if no module matched the action.
    #[must_use]
    pub fn is_unhandled(&self) -> bool { matches!(self, Self::NoHandlerFound { .. }) }
}

fn summarize(failures: &[ModuleFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used by module implementations.
pub type Result<T, E = ModuleError> = std::result::Result<T, E>;
