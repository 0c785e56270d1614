#![cfg(test)]
//! Modules and fixtures shared by unit tests.

use std::sync::{
    Arc,
    Mutex,
    PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    clock::ManualClock,
    error::{ModuleError, Result},
    lifecycle::{LifecycleState, Startable},
    message::Message,
    options::Options,
    partnership::Partnership,
    processor::{Module, Processor},
};

/// One observed `handle` call.
#[derive(Clone, Debug)]
pub(crate) struct Call {
    pub(crate) action: String,
    pub(crate) message_id: String,
    pub(crate) options: Options,
}

/// Module accepting a fixed set of actions and recording every call.
///
/// The first `failures` calls return an error.
pub(crate) struct Recorder {
    name: String,
    actions: Vec<String>,
    failures: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    pub(crate) fn new(name: &str, actions: &[&str]) -> Arc<Self> {
        Arc::new(Self::build(name, actions, 0))
    }

    pub(crate) fn failing(name: &str, actions: &[&str], failures: usize) -> Arc<Self> {
        Arc::new(Self::build(name, actions, failures))
    }

    fn build(name: &str, actions: &[&str], failures: usize) -> Self {
        Self {
            name: name.to_owned(),
            actions: actions.iter().map(|a| (*a).to_owned()).collect(),
            failures: AtomicUsize::new(failures),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn call_count(&self) -> usize { self.calls().len() }
}

#[async_trait]
impl Module for Recorder {
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
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Call {
                action: action.to_owned(),
                message_id: message.id().to_owned(),
                options: options.clone(),
            });
        let should_fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ModuleError::msg(format!("{} refused {action}", self.name)));
        }
        Ok(())
    }
}

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
        .single()
        .unwrap_or_default()
}

pub(crate) fn manual_clock() -> Arc<ManualClock> { Arc::new(ManualClock::new(epoch())) }

pub(crate) fn message(id: &str) -> Message {
    Message::with_id(id, Partnership::between("alpha", "beta"))
}

/// Active module whose `start` and `stop` always fail.
pub(crate) struct Broken {
    name: String,
}

impl Broken {
    pub(crate) fn new(name: &str) -> Arc<Self> { Arc::new(Self { name: name.to_owned() }) }
}

#[async_trait]
impl Module for Broken {
    fn name(&self) -> &str { &self.name }

    fn can_handle(&self, _action: &str, _message: &Message, _options: &Options) -> bool { false }

    async fn handle(
        &self,
        _processor: &Processor,
        _action: &str,
        _message: &mut Message,
        _options: &Options,
    ) -> Result<()> {
        Ok(())
    }

    fn as_startable(&self) -> Option<&dyn Startable> { Some(self) }
}

#[async_trait]
impl Startable for Broken {
    async fn start(&self, _processor: &Processor) -> Result<()> {
        Err(ModuleError::msg(format!("{} cannot start", self.name)))
    }

    async fn stop(&self) -> Result<()> { Err(ModuleError::msg(format!("{} cannot stop", self.name))) }

    fn state(&self) -> LifecycleState { LifecycleState::Stopped }
}
