//! Start/stop contract for modules that run background work.
//!
//! A module opts into background execution by implementing [`Startable`]
//! and returning itself from [`crate::processor::Module::as_startable`].
//! Timer-driven modules compose a [`Poller`] rather than inheriting from a
//! base type.

mod poller;

use async_trait::async_trait;
pub use poller::{DEFAULT_POLLING_INTERVAL, Poller, PollerConfig};
use thiserror::Error;

use crate::{error::ModuleError, processor::Processor};

/// Observable lifecycle of an active module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not running. Initial and final state.
    Stopped,
    /// Background work is being launched.
    Starting,
    /// Background work is scheduled.
    Running,
    /// Cancellation requested; waiting for in-flight work.
    Stopping,
}

/// Errors raised by lifecycle transitions.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// `start` was called while the module was not stopped.
    #[error("already running (state: {0:?})")]
    AlreadyRunning(LifecycleState),
}

/// Capability of modules that own a background execution context.
#[async_trait]
pub trait Startable: Send + Sync {
    /// Launch background work. `processor` is the dispatcher the module
    /// resubmits through.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] if the module is already running or its
    /// resources cannot be prepared.
    async fn start(&self, processor: &Processor) -> Result<(), ModuleError>;

    /// Cancel future background work, waiting for any in-flight execution.
    ///
    /// Stopping a stopped module is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] if shutdown work fails.
    async fn stop(&self) -> Result<(), ModuleError>;

    /// Current lifecycle state.
    fn state(&self) -> LifecycleState;
}
