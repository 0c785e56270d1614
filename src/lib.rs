#![doc(html_root_url = "https://docs.rs/as2relay/latest")]
//! Public API for the `as2relay` library.
//!
//! This crate provides the reliable-delivery core of an AS2 endpoint: an
//! action dispatcher fanning messages out to pluggable modules, resenders
//! giving at-least-once delivery (immediate, in-memory and durable
//! directory queues), and the HTTP body readers an AS2 receiver needs,
//! including a chunked transfer decoder.

pub mod byte_order;
pub mod chunked;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod metrics;
pub mod options;
pub mod panic;
pub mod partnership;
pub mod payload;
pub mod processor;
pub mod resend;
mod test_helpers;

pub use chunked::{ChunkDecoder, ChunkEof, ChunkedError, ChunkedReader};
pub use error::{DispatchError, ModuleError, ModuleFailure, Result};
pub use lifecycle::{LifecycleState, Poller, PollerConfig, Startable};
pub use message::{Headers, Mdn, Message};
pub use options::{Options, action};
pub use partnership::Partnership;
pub use payload::{Payload, PayloadError, PayloadReader, ProtocolError, ReadStrategy};
pub use processor::{Module, Processor, WeakProcessor};
pub use resend::{
    DirectoryResender,
    ImmediateResender,
    MemoryResender,
    ResendOutcome,
    request_resend,
};
