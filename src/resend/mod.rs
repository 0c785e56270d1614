//! Resend subsystem giving AS2 its at-least-once delivery.
//!
//! Senders that hit a transient failure request a resend through
//! [`request_resend`]. One of the resend modules then accepts the
//! `resend` action and later re-dispatches the original action:
//!
//! - [`ImmediateResender`] re-dispatches synchronously within the same call.
//! - [`MemoryResender`] queues items in memory and resubmits them from a
//!   poll task. Items still queued at shutdown are discarded.
//! - [`DirectoryResender`] persists items as files and resubmits them from a
//!   poll task. A file that fails is moved to the error directory and never
//!   revisited.
//!
//! # Retry countdown
//!
//! The remaining retry count travels in the options bag under
//! [`crate::options::RETRIES`]. Every attempt decrements it by exactly one
//! before resubmission. A request arriving with zero retries left is not
//! scheduled: it is logged together with its cause and the message is
//! abandoned.

mod directory;
mod immediate;
mod item;
mod memory;
mod record;

use std::time::Duration;

pub use directory::{DirectoryResender, ScanReport};
pub use immediate::ImmediateResender;
pub use item::ResendItem;
pub use memory::{MemoryResender, PollReport};
pub use record::{FORMAT_VERSION, RECORD_MAGIC, RecordError, ResendRecord};

use crate::{
    error::DispatchError,
    message::Message,
    metrics,
    options::{Options, action},
    processor::Processor,
};

/// Retries allowed when a resend request carries no `retries` option.
pub const DEFAULT_RETRIES: u32 = 5;

/// Delay between a resend request and its first attempt.
pub const DEFAULT_RESEND_DELAY: Duration = Duration::from_secs(60);

/// Whether a resend request was accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A resender accepted the request.
    Scheduled,
    /// No retries remained; the message was abandoned.
    Exhausted,
}

/// Ask the processor to resend `message`, honouring the retry countdown.
///
/// `options` should carry the `resend-action` to re-dispatch (defaulting to
/// `send`) and the `retries` remaining. The caller is told by return value
/// when the budget is already spent; in that case nothing is dispatched.
///
/// # Errors
///
/// Returns the [`DispatchError`] raised by the `resend` dispatch.
pub async fn request_resend(
    processor: &Processor,
    message: &mut Message,
    options: &Options,
) -> Result<ResendOutcome, DispatchError> {
    if options.retries() == Some(0) {
        abandon(message, options);
        return Ok(ResendOutcome::Exhausted);
    }
    processor.handle(action::RESEND, message, options).await?;
    Ok(ResendOutcome::Scheduled)
}

/// Action a resend should re-dispatch.
pub(crate) fn resend_action(options: &Options) -> String {
    options.resend_action().unwrap_or(action::SEND).to_owned()
}

/// Take one attempt from the retry budget in `options`.
///
/// Returns the retries left after this attempt, or `None` when the budget
/// is spent and the message has been abandoned.
pub(crate) fn take_attempt(message: &Message, options: &Options) -> Option<u32> {
    let remaining = options.retries_or(DEFAULT_RETRIES);
    let next = remaining.checked_sub(1);
    if next.is_none() {
        abandon(message, options);
    }
    next
}

fn abandon(message: &Message, options: &Options) {
    log::warn!(
        "{}: retries exhausted, abandoning resend of `{}` (cause: {})",
        message.log_id(),
        resend_action(options),
        options.cause().unwrap_or("unknown"),
    );
    metrics::inc_resend_exhausted();
}
