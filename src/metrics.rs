//! Metric helpers for `as2relay`.
//!
//! This module defines metric names and thin helpers wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

/// Name of the counter tracking dispatched actions by outcome.
pub const DISPATCH_TOTAL: &str = "as2relay_dispatch_total";
/// Name of the counter tracking individual module failures.
pub const MODULE_FAILURES_TOTAL: &str = "as2relay_module_failures_total";
/// Name of the counter tracking resends accepted by a resender.
pub const RESEND_SCHEDULED_TOTAL: &str = "as2relay_resend_scheduled_total";
/// Name of the counter tracking messages abandoned after their last retry.
pub const RESEND_EXHAUSTED_TOTAL: &str = "as2relay_resend_exhausted_total";
/// Name of the gauge tracking items held by in-memory resend queues.
pub const RESEND_QUEUE_DEPTH: &str = "as2relay_resend_queue_depth";

/// Outcome of a single dispatch.
#[derive(Clone, Copy, Debug)]
pub enum Outcome {
    /// At least one module handled the action and none failed.
    Handled,
    /// No module accepted the action.
    Unhandled,
    /// At least one module failed.
    Failed,
}

impl Outcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Handled => "handled",
            Outcome::Unhandled => "unhandled",
            Outcome::Failed => "failed",
        }
    }
}

/// Record a completed dispatch.
pub fn inc_dispatch(outcome: Outcome) {
    #[cfg(feature = "metrics")]
    metrics::counter!(DISPATCH_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record `count` module failures from one dispatch.
pub fn inc_module_failures(count: usize) {
    #[cfg(feature = "metrics")]
    metrics::counter!(MODULE_FAILURES_TOTAL).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record a resend accepted by the queue named `queue`.
pub fn inc_resend_scheduled(queue: &'static str) {
    #[cfg(feature = "metrics")]
    metrics::counter!(RESEND_SCHEDULED_TOTAL, "queue" => queue).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = queue;
}

/// Record a message abandoned because its retries ran out.
pub fn inc_resend_exhausted() {
    #[cfg(feature = "metrics")]
    metrics::counter!(RESEND_EXHAUSTED_TOTAL).increment(1);
}

/// Publish the current depth of an in-memory resend queue.
pub fn set_queue_depth(depth: usize) {
    #[cfg(feature = "metrics")]
    #[expect(
        clippy::cast_precision_loss,
        reason = "queue depths stay far below f64 precision limits"
    )]
    metrics::gauge!(RESEND_QUEUE_DEPTH).set(depth as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = depth;
}
