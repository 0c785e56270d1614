//! Ready-made modules for dispatch tests.

use std::sync::{Arc, Mutex, PoisonError};

use as2relay::{Message, Module, ModuleError, Options, Processor};
use async_trait::async_trait;

/// A `handle` call observed by [`RecordingModule`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    /// Dispatched action.
    pub action: String,
    /// Id of the message handled.
    pub message_id: String,
    /// Options passed with the call.
    pub options: Options,
}

/// Module accepting a fixed set of actions and recording each call.
pub struct RecordingModule {
    name: String,
    actions: Vec<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingModule {
    /// Create a module named `name` that handles `actions`.
    pub fn new(name: &str, actions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            actions: actions.iter().map(|a| (*a).to_owned()).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls observed so far.
    pub fn call_count(&self) -> usize { self.calls().len() }
}

#[async_trait]
impl Module for RecordingModule {
    fn name(&self) -> &str { &self.name }

    fn can_handle(&self, action: &str, _message: &Message, _options: &Options) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    async fn handle(
        &self,
        _processor: &Processor,
        action: &str,
        message: &mut Message,
        options: &Options,
    ) -> Result<(), ModuleError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                action: action.to_owned(),
                message_id: message.id().to_owned(),
                options: options.clone(),
            });
        Ok(())
    }
}

/// Module that always fails the actions it accepts.
pub struct FailingModule {
    name: String,
    action: String,
    reason: String,
}

impl FailingModule {
    /// Create a module failing `action` with `reason`.
    pub fn new(name: &str, action: &str, reason: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            action: action.to_owned(),
            reason: reason.to_owned(),
        })
    }
}

#[async_trait]
impl Module for FailingModule {
    fn name(&self) -> &str { &self.name }

    fn can_handle(&self, action: &str, _message: &Message, _options: &Options) -> bool {
        action == self.action
    }

    async fn handle(
        &self,
        _processor: &Processor,
        _action: &str,
        _message: &mut Message,
        _options: &Options,
    ) -> Result<(), ModuleError> {
        Err(ModuleError::msg(self.reason.clone()))
    }
}
