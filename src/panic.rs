//! Rendering of panic payloads caught in background tasks.

use std::{any::Any, fmt};

/// Displays a caught panic payload.
///
/// `String` and `&'static str` payloads print as-is; anything else falls
/// back to `Debug`.
///
/// ```
/// use as2relay::panic::format_panic;
///
/// assert_eq!(format_panic(Box::new("tick failed")).to_string(), "tick failed");
/// assert!(format_panic(Box::new(7_u8)).to_string().contains("Any"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (
            self.0.downcast_ref::<String>(),
            self.0.downcast_ref::<&'static str>(),
        ) {
            (Some(message), _) => f.write_str(message),
            (None, Some(message)) => f.write_str(message),
            (None, None) => write!(f, "{:?}", self.0),
        }
    }
}

/// Wrap a payload returned by `catch_unwind` for logging.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }
