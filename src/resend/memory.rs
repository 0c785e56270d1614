//! Resender that queues items in memory and polls for due ones.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use super::{ResendItem, resend_action, take_attempt};
use crate::{
    clock::{self, Clock},
    config::ResenderConfig,
    error::Result,
    lifecycle::{LifecycleState, Poller, Startable},
    message::Message,
    metrics,
    options::{Options, action},
    processor::{Module, Processor},
};

/// Counts from a single poll tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Items that were due and resubmitted.
    pub attempted: usize,
    /// Resubmissions that succeeded and were removed.
    pub delivered: usize,
    /// Resubmissions that failed and stay queued.
    pub failed: usize,
}

struct Queued {
    id: u64,
    item: ResendItem,
}

#[derive(Default)]
struct Queue {
    items: RwLock<Vec<Queued>>,
    next_id: AtomicU64,
}

impl Queue {
    async fn push(&self, item: ResendItem) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut items = self.items.write().await;
        items.push(Queued { id, item });
        metrics::set_queue_depth(items.len());
    }

    async fn resend_due(&self, clock: &dyn Clock, processor: &Processor, name: &str) -> PollReport {
        let now = clock.now();
        let due: Vec<(u64, ResendItem)> = self
            .items
            .read()
            .await
            .iter()
            .filter(|queued| queued.item.is_time_to_send(now))
            .map(|queued| (queued.id, queued.item.clone()))
            .collect();

        let mut report = PollReport {
            attempted: due.len(),
            ..PollReport::default()
        };
        for (id, mut item) in due {
            let options = item.resubmit_options();
            match processor
                .handle(&item.resend_action, &mut item.message, &options)
                .await
            {
                Ok(()) => {
                    let mut items = self.items.write().await;
                    items.retain(|queued| queued.id != id);
                    metrics::set_queue_depth(items.len());
                    report.delivered += 1;
                }
                Err(error) => {
                    // Left queued; the next tick tries again.
                    tracing::debug!(
                        resender = name,
                        message_id = item.message.id(),
                        %error,
                        "resubmission failed, item stays queued"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Queues resends in memory and resubmits them once their delay elapses.
///
/// Items are held only in memory: stopping the resender while items remain
/// logs a warning and discards them.
pub struct MemoryResender {
    name: String,
    config: ResenderConfig,
    clock: Arc<dyn Clock>,
    queue: Arc<Queue>,
    poller: Poller,
}

impl MemoryResender {
    /// Create a resender using the system clock.
    #[must_use]
    pub fn new(config: ResenderConfig) -> Self { Self::with_clock(config, clock::system()) }

    /// Create a resender reading time from `clock`.
    #[must_use]
    pub fn with_clock(config: ResenderConfig, clock: Arc<dyn Clock>) -> Self {
        let name = String::from("memory-resender");
        Self {
            poller: Poller::new(name.clone(), config.polling),
            name,
            config,
            clock,
            queue: Arc::new(Queue::default()),
        }
    }

    /// Rename the resender for logs and failure reports.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.poller = Poller::new(self.name.clone(), self.config.polling);
        self
    }

    /// Number of queued items.
    pub async fn pending(&self) -> usize { self.queue.items.read().await.len() }

    /// Snapshot of the queued items in arrival order.
    pub async fn items(&self) -> Vec<ResendItem> {
        self.queue
            .items
            .read()
            .await
            .iter()
            .map(|queued| queued.item.clone())
            .collect()
    }

    /// Run one poll tick now, resubmitting every due item.
    pub async fn poll_once(&self, processor: &Processor) -> PollReport {
        self.queue
            .resend_due(self.clock.as_ref(), processor, &self.name)
            .await
    }
}

#[async_trait]
impl Module for MemoryResender {
    fn name(&self) -> &str { &self.name }

    fn can_handle(&self, action: &str, _message: &Message, _options: &Options) -> bool {
        action == action::RESEND
    }

    async fn handle(
        &self,
        _processor: &Processor,
        _action: &str,
        message: &mut Message,
        options: &Options,
    ) -> Result<()> {
        let Some(retries) = take_attempt(message, options) else {
            return Ok(());
        };
        let delay = TimeDelta::from_std(self.config.resend_delay).unwrap_or(TimeDelta::MAX);
        let due = self
            .clock
            .now()
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let item = ResendItem::new(
            resend_action(options),
            message.clone(),
            retries,
            due,
            options.clone(),
        );
        tracing::info!(
            resender = %self.name,
            message_id = message.id(),
            action = %item.resend_action,
            retries,
            %due,
            "resend queued"
        );
        self.queue.push(item).await;
        metrics::inc_resend_scheduled("memory");
        Ok(())
    }

    fn as_startable(&self) -> Option<&dyn Startable> { Some(self) }
}

#[async_trait]
impl Startable for MemoryResender {
    async fn start(&self, processor: &Processor) -> Result<()> {
        let queue = Arc::clone(&self.queue);
        let clock = Arc::clone(&self.clock);
        let weak = processor.downgrade();
        let name = self.name.clone();
        self.poller.start(move || {
            let queue = Arc::clone(&queue);
            let clock = Arc::clone(&clock);
            let weak = weak.clone();
            let name = name.clone();
            async move {
                let Some(processor) = weak.upgrade() else {
                    return;
                };
                let report = queue.resend_due(clock.as_ref(), &processor, &name).await;
                if report.attempted > 0 {
                    tracing::debug!(resender = %name, ?report, "poll tick finished");
                }
            }
        })?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.poller.stop().await;
        let mut items = self.queue.items.write().await;
        if !items.is_empty() {
            log::warn!(
                "{}: discarding {} queued resend(s) on shutdown",
                self.name,
                items.len()
            );
            items.clear();
            metrics::set_queue_depth(0);
        }
        Ok(())
    }

    fn state(&self) -> LifecycleState { self.poller.state() }
}
