//! The unit of pluggable behaviour registered with a [`Processor`].

use std::{any::Any, sync::Arc};

use async_trait::async_trait;

use super::Processor;
use crate::{error::Result, lifecycle::Startable, message::Message, options::Options};

/// Type-erasure helper letting the processor recover concrete module types.
///
/// Implemented automatically for every `Send + Sync + 'static` type.
pub trait AsAny: Any + Send + Sync {
    /// Convert a shared module into a shared `Any`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
}

/// A capability unit that reacts to dispatched actions.
///
/// # Examples
///
/// ```
/// use as2relay::{
///     error::Result,
///     message::Message,
///     options::{Options, action},
///     processor::{Module, Processor},
/// };
/// use async_trait::async_trait;
///
/// struct Tagger;
///
/// #[async_trait]
/// impl Module for Tagger {
///     fn name(&self) -> &str { "tagger" }
///
///     fn can_handle(&self, action: &str, _: &Message, _: &Options) -> bool {
///         action == action::STORE
///     }
///
///     async fn handle(
///         &self,
///         _processor: &Processor,
///         _action: &str,
///         message: &mut Message,
///         _options: &Options,
///     ) -> Result<()> {
///         message.set_attribute("tagged", "yes");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Module: AsAny {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Whether this module wants to handle `action` for `message`.
    fn can_handle(&self, action: &str, message: &Message, options: &Options) -> bool;

    /// Perform the module's effect.
    ///
    /// `processor` is the dispatcher that invoked the module; modules that
    /// resubmit work dispatch through it.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ModuleError`] describing the failure. The
    /// processor records it and carries on with the remaining modules.
    async fn handle(
        &self,
        processor: &Processor,
        action: &str,
        message: &mut Message,
        options: &Options,
    ) -> Result<()>;

    /// Background lifecycle, for modules that run work outside dispatch.
    fn as_startable(&self) -> Option<&dyn Startable> { None }
}
