//! Resender that retries synchronously with no delay.

use async_trait::async_trait;

use super::{resend_action, take_attempt};
use crate::{
    error::Result,
    message::Message,
    metrics,
    options::{Options, action},
    processor::{Module, Processor},
};

/// Re-dispatches the original action within the `resend` call itself.
///
/// No queueing takes place: the decremented options are handed straight
/// back to the processor, and a failure of that dispatch is this module's
/// failure.
#[derive(Clone, Debug)]
pub struct ImmediateResender {
    name: String,
}

impl Default for ImmediateResender {
    fn default() -> Self { Self::new("immediate-resender") }
}

impl ImmediateResender {
    /// Create a resender reported under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into() } }
}

#[async_trait]
impl Module for ImmediateResender {
    fn name(&self) -> &str { &self.name }

    fn can_handle(&self, action: &str, _message: &Message, _options: &Options) -> bool {
        action == action::RESEND
    }

    async fn handle(
        &self,
        processor: &Processor,
        _action: &str,
        message: &mut Message,
        options: &Options,
    ) -> Result<()> {
        let Some(retries) = take_attempt(message, options) else {
            return Ok(());
        };
        let target = resend_action(options);
        let options = options.clone().with_retries(retries);
        metrics::inc_resend_scheduled("immediate");
        tracing::debug!(
            resender = %self.name,
            message_id = message.id(),
            action = %target,
            retries,
            "resending immediately"
        );
        processor.handle(&target, message, &options).await?;
        Ok(())
    }
}
