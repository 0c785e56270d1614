//! Resender that persists pending resends as files.
//!
//! Each request becomes one file in the resend directory, named after its
//! due time and holding an encoded [`ResendRecord`]. A poll task picks up
//! due files, takes one attempt from the stored retry count and resubmits
//! the stored action. Success deletes the file; any failure moves it to the
//! error directory, where it is never retried.

mod files;
mod naming;

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use super::{ResendRecord, resend_action, take_attempt};
use crate::{
    clock::{self, Clock},
    config::DirectoryResenderConfig,
    error::{ModuleError, Result},
    lifecycle::{LifecycleState, Poller, Startable},
    message::Message,
    metrics,
    options::{Options, action},
    processor::{Module, Processor},
};

/// Counts from a single directory scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files resubmitted successfully and deleted.
    pub resent: usize,
    /// Files moved to the error directory.
    pub failed: usize,
    /// Due files still locked or being written.
    pub busy: usize,
    /// Files not yet due.
    pub waiting: usize,
}

enum Attempt {
    Resent,
    Busy,
}

struct Store {
    name: String,
    config: DirectoryResenderConfig,
    clock: Arc<dyn Clock>,
}

impl Store {
    async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.config.resend_dir).await?;
        tokio::fs::create_dir_all(&self.config.error_dir).await
    }

    fn due_at(&self) -> DateTime<Utc> {
        let delay = TimeDelta::from_std(self.config.timing.resend_delay).unwrap_or(TimeDelta::MAX);
        self.clock
            .now()
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn persist(&self, record: &ResendRecord) -> Result<PathBuf> {
        let bytes = record.to_bytes()?;
        let stem = naming::stem(self.due_at());
        Ok(files::write_new(self.config.resend_dir.clone(), stem, bytes).await?)
    }

    async fn scan(&self, processor: &Processor) -> ScanReport {
        let mut report = ScanReport::default();
        let paths = match files::list(&self.config.resend_dir).await {
            Ok(paths) => paths,
            Err(error) => {
                tracing::error!(
                    resender = %self.name,
                    dir = %self.config.resend_dir.display(),
                    %error,
                    "cannot list resend directory"
                );
                return report;
            }
        };
        let now = self.clock.now();
        for path in paths {
            let due = path
                .file_name()
                .and_then(OsStr::to_str)
                .and_then(naming::due_time);
            match due {
                None => {
                    tracing::warn!(
                        resender = %self.name,
                        file = %path.display(),
                        "unrecognised file in resend directory"
                    );
                    self.quarantine(path).await;
                    report.failed += 1;
                }
                Some(due) if due > now => report.waiting += 1,
                Some(_) => match self.resend_file(&path, processor).await {
                    Ok(Attempt::Busy) => report.busy += 1,
                    Ok(Attempt::Resent) => {
                        if let Err(error) = tokio::fs::remove_file(&path).await {
                            tracing::error!(
                                resender = %self.name,
                                file = %path.display(),
                                %error,
                                "resent file could not be removed"
                            );
                        }
                        report.resent += 1;
                    }
                    Err(error) => {
                        tracing::error!(
                            resender = %self.name,
                            file = %path.display(),
                            %error,
                            "resend failed"
                        );
                        self.quarantine(path).await;
                        report.failed += 1;
                    }
                },
            }
        }
        report
    }

    async fn resend_file(&self, path: &Path, processor: &Processor) -> Result<Attempt> {
        let Some(bytes) = files::read_settled(path.to_path_buf()).await? else {
            return Ok(Attempt::Busy);
        };
        let mut record = ResendRecord::from_bytes(&bytes)?;
        let Some(retries) = record.retries.checked_sub(1) else {
            return Err(ModuleError::msg(format!(
                "{}: stored record has no retries left",
                record.message.log_id()
            )));
        };
        let options = Options::new()
            .with_retries(retries)
            .with_resend_action(record.resend_action.as_str());
        tracing::debug!(
            resender = %self.name,
            message_id = record.message.id(),
            action = %record.resend_action,
            retries,
            "resending from file"
        );
        processor
            .handle(&record.resend_action, &mut record.message, &options)
            .await?;
        Ok(Attempt::Resent)
    }

    async fn quarantine(&self, path: PathBuf) {
        let shown = path.display().to_string();
        match files::move_into(path, self.config.error_dir.clone()).await {
            Ok(target) => tracing::info!(
                resender = %self.name,
                file = %shown,
                target = %target.display(),
                "moved to error directory"
            ),
            Err(error) => tracing::error!(
                resender = %self.name,
                file = %shown,
                %error,
                "cannot move file to error directory"
            ),
        }
    }
}

/// Persists resends to a directory and resubmits them once due.
///
/// Pending files survive restarts; files in the error directory are left
/// for an operator.
pub struct DirectoryResender {
    store: Arc<Store>,
    poller: Poller,
}

impl DirectoryResender {
    /// Create a resender using the system clock.
    #[must_use]
    pub fn new(config: DirectoryResenderConfig) -> Self { Self::with_clock(config, clock::system()) }

    /// Create a resender reading time from `clock`.
    #[must_use]
    pub fn with_clock(config: DirectoryResenderConfig, clock: Arc<dyn Clock>) -> Self {
        Self::build(String::from("directory-resender"), config, clock)
    }

    /// Rename the resender for logs and failure reports.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        let config = self.store.config.clone();
        let clock = Arc::clone(&self.store.clock);
        Self::build(name.into(), config, clock)
    }

    fn build(name: String, config: DirectoryResenderConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            poller: Poller::new(name.clone(), config.timing.polling),
            store: Arc::new(Store {
                name,
                config,
                clock,
            }),
        }
    }

    /// Directory holding pending files.
    #[must_use]
    pub fn resend_dir(&self) -> &Path { &self.store.config.resend_dir }

    /// Directory receiving failed files.
    #[must_use]
    pub fn error_dir(&self) -> &Path { &self.store.config.error_dir }

    /// Pending files in name order.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while listing the directory.
    pub async fn pending(&self) -> std::io::Result<Vec<PathBuf>> {
        files::list(&self.store.config.resend_dir).await
    }

    /// Run one scan now, resubmitting every due file.
    pub async fn poll_once(&self, processor: &Processor) -> ScanReport {
        self.store.scan(processor).await
    }
}

#[async_trait]
impl Module for DirectoryResender {
    fn name(&self) -> &str { &self.store.name }

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
        // The stored count is decremented when the file is picked up.
        if take_attempt(message, options).is_none() {
            return Ok(());
        }
        let record = ResendRecord {
            resend_action: resend_action(options),
            retries: options.retries_or(super::DEFAULT_RETRIES),
            message: message.clone(),
        };
        let path = self.store.persist(&record).await?;
        tracing::info!(
            resender = %self.store.name,
            message_id = message.id(),
            action = %record.resend_action,
            retries = record.retries,
            file = %path.display(),
            "resend stored"
        );
        metrics::inc_resend_scheduled("directory");
        Ok(())
    }

    fn as_startable(&self) -> Option<&dyn Startable> { Some(self) }
}

#[async_trait]
impl Startable for DirectoryResender {
    async fn start(&self, processor: &Processor) -> Result<()> {
        self.store.ensure_dirs().await?;
        let store = Arc::clone(&self.store);
        let weak = processor.downgrade();
        self.poller.start(move || {
            let store = Arc::clone(&store);
            let weak = weak.clone();
            async move {
                let Some(processor) = weak.upgrade() else {
                    return;
                };
                let report = store.scan(&processor).await;
                if report != ScanReport::default() {
                    tracing::debug!(resender = %store.name, ?report, "scan finished");
                }
            }
        })?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.poller.stop().await;
        Ok(())
    }

    fn state(&self) -> LifecycleState { self.poller.state() }
}
