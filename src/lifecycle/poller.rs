//! Reusable periodic task for active modules.

use std::{
    panic::AssertUnwindSafe,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures::{Future, FutureExt};
use serde::Deserialize;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval, sleep},
};
use tokio_util::sync::CancellationToken;

use super::{LifecycleError, LifecycleState};
use crate::panic::format_panic;

/// Default period between poll ticks.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);

/// Timing of a [`Poller`].
///
/// # Default Values
/// - `initial_delay`: zero, so the first tick runs as soon as the poller starts
/// - `period`: [`DEFAULT_POLLING_INTERVAL`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Delay before the first tick.
    pub initial_delay: Duration,
    /// Delay between the start of consecutive ticks.
    pub period: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            period: DEFAULT_POLLING_INTERVAL,
        }
    }
}

impl PollerConfig {
    /// Clamp the period to at least one millisecond.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use as2relay::lifecycle::PollerConfig;
    ///
    /// let cfg = PollerConfig {
    ///     initial_delay: Duration::ZERO,
    ///     period: Duration::ZERO,
    /// };
    /// assert_eq!(cfg.normalized().period, Duration::from_millis(1));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.period = self.period.max(Duration::from_millis(1));
        self
    }
}

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Slot {
    state: LifecycleState,
    running: Option<Running>,
}

/// Periodic background task with an explicit lifecycle.
///
/// `stop` cancels future ticks but never interrupts a tick that has already
/// begun; it returns once that tick completes. A panicking tick is logged
/// and the poller keeps its schedule.
pub struct Poller {
    name: String,
    config: PollerConfig,
    slot: Mutex<Slot>,
}

impl Poller {
    /// Create a stopped poller. `name` labels log events.
    #[must_use]
    pub fn new(name: impl Into<String>, config: PollerConfig) -> Self {
        Self {
            name: name.into(),
            config: config.normalized(),
            slot: Mutex::new(Slot {
                state: LifecycleState::Stopped,
                running: None,
            }),
        }
    }

    /// Timing this poller runs with.
    #[must_use]
    pub fn config(&self) -> PollerConfig { self.config }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState { self.lock().state }

    /// Spawn the polling task, calling `tick` once per period.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyRunning`] unless the poller is stopped.
    pub fn start<F, Fut>(&self, tick: F) -> Result<(), LifecycleError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.lock();
        if slot.state != LifecycleState::Stopped {
            return Err(LifecycleError::AlreadyRunning(slot.state));
        }
        slot.state = LifecycleState::Starting;
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(self.name.clone(), self.config, token.clone(), tick));
        slot.running = Some(Running { token, handle });
        slot.state = LifecycleState::Running;
        tracing::debug!(poller = %self.name, period = ?self.config.period, "poller started");
        Ok(())
    }

    /// Cancel future ticks and wait for an in-flight tick to finish.
    pub async fn stop(&self) {
        let running = {
            let mut slot = self.lock();
            if slot.state != LifecycleState::Running {
                return;
            }
            slot.state = LifecycleState::Stopping;
            slot.running.take()
        };
        if let Some(Running { token, handle }) = running {
            token.cancel();
            if let Err(error) = handle.await {
                tracing::error!(poller = %self.name, %error, "poller task ended abnormally");
            }
        }
        self.lock().state = LifecycleState::Stopped;
        tracing::debug!(poller = %self.name, "poller stopped");
    }

    fn lock(&self) -> MutexGuard<'_, Slot> { self.slot.lock().unwrap_or_else(PoisonError::into_inner) }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = slot.running.take() {
            running.token.cancel();
        }
    }
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn run<F, Fut>(name: String, config: PollerConfig, token: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::select! {
        biased;

        () = token.cancelled() => return,
        () = sleep(config.initial_delay) => {}
    }

    let mut ticker = interval(config.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;

            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // The tick runs outside the select so cancellation never interrupts it.
        if let Err(panic) = AssertUnwindSafe(tick()).catch_unwind().await {
            tracing::error!(poller = %name, panic = %format_panic(panic), "poll tick panicked");
        }
    }
}
