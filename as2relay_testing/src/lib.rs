//! Test utilities for `as2relay`.
//!
//! - [`RecordingModule`] and [`FailingModule`] stand in for senders and
//!   storage modules registered with a [`as2relay::Processor`].
//! - [`encode_chunked`] builds chunked bodies for decoder tests.
//! - [`LoggerHandle`] and the [`logger`] fixture capture `log` output.
//! - [`MetricsSnapshot`] reads a debugging metrics
//!   recorder.
//!
//! ```rust
//! use as2relay::{Options, Processor, message::Message, partnership::Partnership};
//! use as2relay_testing::RecordingModule;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let processor = Processor::new();
//! let sender = RecordingModule::new("sender", &["send"]);
//! processor.add_module(sender.clone());
//! let mut message = Message::new(Partnership::between("alpha", "beta"));
//! processor
//!     .handle("send", &mut message, &Options::new())
//!     .await
//!     .expect("sent");
//! assert_eq!(sender.call_count(), 1);
//! # }
//! ```

pub mod chunks;
pub mod logging;
pub mod metrics;
pub mod modules;

pub use chunks::{chunk_sizes, encode_chunked};
pub use logging::{LoggerHandle, logger};
pub use metrics::{MetricsSnapshot, debugging_recorder_setup};
pub use modules::{FailingModule, RecordedCall, RecordingModule};
