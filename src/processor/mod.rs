//! Action dispatcher fanning `(action, message, options)` out to modules.
//!
//! The [`Processor`] keeps an ordered registry of [`Module`]s. Each call to
//! [`Processor::handle`] walks a snapshot of that registry in registration
//! order and invokes every module whose [`Module::can_handle`] accepts the
//! action. A failing module never prevents later modules from running; all
//! failures are reported together in a single [`DispatchError::Failed`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use as2relay::{
//!     message::Message,
//!     options::{Options, action},
//!     partnership::Partnership,
//!     processor::Processor,
//!     resend::ImmediateResender,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let processor = Processor::new();
//! processor.add_module(Arc::new(ImmediateResender::default()));
//!
//! let mut message = Message::new(Partnership::between("alpha", "beta"));
//! // Nothing handles `send`, so the resubmission fails as unhandled.
//! let err = processor
//!     .handle(action::RESEND, &mut message, &Options::new().with_retries(1))
//!     .await
//!     .expect_err("no sender registered");
//! assert_eq!(err.failures().len(), 1);
//! # }
//! ```

mod module;

use std::sync::{Arc, PoisonError, RwLock, Weak};

pub use module::{AsAny, Module};

use crate::{
    error::{DispatchError, ModuleFailure},
    message::Message,
    metrics,
    options::Options,
};

type Registry = Arc<[Arc<dyn Module>]>;

struct Inner {
    modules: RwLock<Registry>,
}

/// Ordered module registry and dispatcher.
///
/// Cloning a `Processor` yields another handle to the same registry.
#[derive(Clone)]
pub struct Processor {
    inner: Arc<Inner>,
}

/// Non-owning handle held by background tasks.
///
/// Background tasks keep a `WeakProcessor` so a module never keeps its own
/// processor alive.
#[derive(Clone)]
pub struct WeakProcessor(Weak<Inner>);

impl WeakProcessor {
    /// Recover the processor if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Processor> { self.0.upgrade().map(|inner| Processor { inner }) }
}

impl Default for Processor {
    fn default() -> Self { Self::new() }
}

impl Processor {
    /// Create a processor with no modules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                modules: RwLock::new(Arc::from(Vec::new())),
            }),
        }
    }

    /// Obtain a non-owning handle for background tasks.
    #[must_use]
    pub fn downgrade(&self) -> WeakProcessor { WeakProcessor(Arc::downgrade(&self.inner)) }

    /// Append `module` to the end of the registry.
    pub fn add_module(&self, module: Arc<dyn Module>) {
        self.update(|modules| modules.push(module));
    }

    /// Remove `module` from the registry, returning whether it was present.
    ///
    /// Modules are matched by identity, not by name.
    pub fn remove_module<M: Module + ?Sized>(&self, module: &Arc<M>) -> bool {
        let target = Arc::as_ptr(module);
        let mut removed = false;
        self.update(|modules| {
            let before = modules.len();
            modules.retain(|m| !std::ptr::addr_eq(Arc::as_ptr(m), target));
            removed = modules.len() != before;
        });
        removed
    }

    /// Snapshot of the registered modules in registration order.
    #[must_use]
    pub fn modules(&self) -> Registry {
        Arc::clone(&self.inner.modules.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize { self.modules().len() }

    /// Returns true if no module is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.modules().is_empty() }

    /// First registered module of concrete type `T`.
    #[must_use]
    pub fn module_of_type<T: Module>(&self) -> Option<Arc<T>> {
        self.modules()
            .iter()
            .find_map(|module| Arc::clone(module).into_any().downcast::<T>().ok())
    }

    /// Dispatch `action` to every module that accepts it.
    ///
    /// Modules run sequentially in registration order, each at most once.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Failed`] carrying every module failure if any
    /// matching module failed, or [`DispatchError::NoHandlerFound`] if no
    /// module accepted the action.
    pub async fn handle(
        &self,
        action: &str,
        message: &mut Message,
        options: &Options,
    ) -> Result<(), DispatchError> {
        let modules = self.modules();
        let mut matched = 0_usize;
        let mut failures = Vec::new();

        for module in modules.iter() {
            if !module.can_handle(action, message, options) {
                continue;
            }
            matched += 1;
            if let Err(error) = module.handle(self, action, message, options).await {
                tracing::error!(
                    module = module.name(),
                    action,
                    message_id = message.id(),
                    %error,
                    "module failed"
                );
                failures.push(ModuleFailure {
                    module: module.name().to_owned(),
                    error,
                });
            }
        }

        if !failures.is_empty() {
            metrics::inc_dispatch(metrics::Outcome::Failed);
            metrics::inc_module_failures(failures.len());
            return Err(DispatchError::Failed {
                action: action.to_owned(),
                failures,
            });
        }
        if matched == 0 {
            tracing::warn!(action, message_id = message.id(), "no module handles action");
            metrics::inc_dispatch(metrics::Outcome::Unhandled);
            return Err(DispatchError::NoHandlerFound {
                action: action.to_owned(),
            });
        }
        tracing::debug!(action, message_id = message.id(), matched, "action dispatched");
        metrics::inc_dispatch(metrics::Outcome::Handled);
        Ok(())
    }

    /// Start every active module, returning how many started.
    ///
    /// A module that fails to start is logged and does not prevent the
    /// others from starting.
    pub async fn start_active_modules(&self) -> usize {
        let mut started = 0;
        for module in self.modules().iter() {
            let Some(active) = module.as_startable() else {
                continue;
            };
            match active.start(self).await {
                Ok(()) => started += 1,
                Err(error) => {
                    tracing::error!(module = module.name(), %error, "failed to start module");
                }
            }
        }
        started
    }

    /// Stop every active module, returning how many stopped cleanly.
    ///
    /// A module that fails to stop is logged and does not prevent the
    /// others from stopping.
    pub async fn stop_active_modules(&self) -> usize {
        let mut stopped = 0;
        for module in self.modules().iter() {
            let Some(active) = module.as_startable() else {
                continue;
            };
            match active.stop().await {
                Ok(()) => stopped += 1,
                Err(error) => {
                    tracing::error!(module = module.name(), %error, "failed to stop module");
                }
            }
        }
        stopped
    }

    /// Copy-on-write update so in-flight dispatches keep their snapshot.
    fn update(&self, edit: impl FnOnce(&mut Vec<Arc<dyn Module>>)) {
        let mut guard = self
            .inner
            .modules
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut modules = guard.to_vec();
        edit(&mut modules);
        *guard = Arc::from(modules);
    }
}
