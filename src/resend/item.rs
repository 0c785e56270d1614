//! A message waiting to be resent.

use chrono::{DateTime, Utc};

use crate::{message::Message, options::Options};

/// A queued resend.
///
/// `retries_remaining` is the budget left *after* the attempt this item
/// represents; it only ever decreases.
#[derive(Clone, Debug)]
pub struct ResendItem {
    /// Action re-dispatched when the item is due.
    pub resend_action: String,
    /// Message to resubmit.
    pub message: Message,
    /// Retries still allowed after this attempt.
    pub retries_remaining: u32,
    /// Earliest instant the item may be resubmitted.
    pub earliest_resend_time: DateTime<Utc>,
    options: Options,
}

impl ResendItem {
    /// Create an item carrying the original request `options`.
    #[must_use]
    pub fn new(
        resend_action: impl Into<String>,
        message: Message,
        retries_remaining: u32,
        earliest_resend_time: DateTime<Utc>,
        options: Options,
    ) -> Self {
        Self {
            resend_action: resend_action.into(),
            message,
            retries_remaining,
            earliest_resend_time,
            options,
        }
    }

    /// Whether the item may be resubmitted at `now`. Inclusive of the
    /// earliest resend time.
    #[must_use]
    pub fn is_time_to_send(&self, now: DateTime<Utc>) -> bool { now >= self.earliest_resend_time }

    /// Options for the resubmission: the original options with the
    /// decremented retry count.
    #[must_use]
    pub fn resubmit_options(&self) -> Options {
        self.options
            .clone()
            .with_retries(self.retries_remaining)
            .with_resend_action(&self.resend_action)
    }
}
