//! Action tokens and the options bag passed alongside each dispatch.

use std::collections::BTreeMap;

/// Well-known action tokens.
///
/// The processor treats actions as opaque strings; these constants only
/// name the tokens the bundled modules react to.
pub mod action {
    /// Transmit a message to its partner.
    pub const SEND: &str = "send";
    /// Schedule a failed action for another attempt.
    pub const RESEND: &str = "resend";
    /// Persist a received message.
    pub const STORE: &str = "store";
    /// Persist a received MDN.
    pub const STORE_MDN: &str = "store-mdn";
    /// Transmit an asynchronous MDN.
    pub const SEND_MDN: &str = "send-mdn";
}

/// Key carrying the number of retries still allowed.
pub const RETRIES: &str = "retries";
/// Key naming the action a resend should re-dispatch.
pub const RESEND_ACTION: &str = "resend-action";
/// Key carrying the rendered cause of the failure that triggered a resend.
pub const CAUSE: &str = "cause";

/// String-keyed options accompanying an `(action, message)` pair.
///
/// ```
/// use as2relay::options::Options;
///
/// let options = Options::new().with_retries(3).with_resend_action("send");
/// assert_eq!(options.retries(), Some(3));
/// assert_eq!(options.resend_action(), Some("send"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options(BTreeMap<String, String>);

impl Options {
    /// Create an empty options bag.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Look up a raw option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> { self.0.get(key).map(String::as_str) }

    /// Set a raw option value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remaining retries, if present and a valid non-negative integer.
    ///
    /// Malformed values are treated as absent so the caller's default
    /// applies.
    #[must_use]
    pub fn retries(&self) -> Option<u32> {
        let raw = self.get(RETRIES)?;
        match raw.trim().parse() {
            Ok(retries) => Some(retries),
            Err(_) => {
                tracing::warn!(value = raw, "ignoring malformed retries option");
                None
            }
        }
    }

    /// Remaining retries, falling back to `default` when absent.
    #[must_use]
    pub fn retries_or(&self, default: u32) -> u32 { self.retries().unwrap_or(default) }

    /// Action a resend should re-dispatch.
    #[must_use]
    pub fn resend_action(&self) -> Option<&str> { self.get(RESEND_ACTION) }

    /// Rendered cause of the failure that triggered a resend.
    #[must_use]
    pub fn cause(&self) -> Option<&str> { self.get(CAUSE) }

    /// Return a copy with `retries` replaced.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.insert(RETRIES, retries.to_string());
        self
    }

    /// Return a copy with `resend-action` replaced.
    #[must_use]
    pub fn with_resend_action(mut self, action: impl Into<String>) -> Self {
        self.insert(RESEND_ACTION, action);
        self
    }

    /// Return a copy recording `cause`.
    #[must_use]
    pub fn with_cause(mut self, cause: &dyn std::error::Error) -> Self {
        self.insert(CAUSE, cause.to_string());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
