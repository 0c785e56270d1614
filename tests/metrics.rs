#![cfg(feature = "metrics")]
//! Metrics emitted by dispatch and the resenders.
//!
//! Each test installs a `metrics_util::debugging::DebuggingRecorder` for
//! the current thread and drives the async code on a current-thread
//! runtime inside it.

use std::future::Future;

use as2relay::{
    MemoryResender,
    Message,
    Options,
    Partnership,
    Processor,
    action,
    config::ResenderConfig,
    metrics::{
        DISPATCH_TOTAL,
        MODULE_FAILURES_TOTAL,
        RESEND_EXHAUSTED_TOTAL,
        RESEND_QUEUE_DEPTH,
        RESEND_SCHEDULED_TOTAL,
    },
};
use as2relay_testing::{FailingModule, MetricsSnapshot, RecordingModule, debugging_recorder_setup};
use rstest::rstest;

fn recorded<F: Future<Output = ()>>(run: impl FnOnce() -> F) -> MetricsSnapshot {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime")
            .block_on(run());
    });
    MetricsSnapshot::take(&snapshotter)
}

fn message() -> Message { Message::new(Partnership::between("alpha", "beta")) }

#[rstest]
fn dispatch_outcomes_are_counted() {
    let snapshot = recorded(|| async {
        let processor = Processor::new();
        processor.add_module(RecordingModule::new("store", &[action::STORE]));
        processor.add_module(FailingModule::new("sender", action::SEND, "refused"));

        processor
            .handle(action::STORE, &mut message(), &Options::new())
            .await
            .expect("stored");
        let _ = processor
            .handle(action::SEND, &mut message(), &Options::new())
            .await;
        let _ = processor
            .handle(action::SEND_MDN, &mut message(), &Options::new())
            .await;
    });

    for outcome in ["handled", "failed", "unhandled"] {
        assert_eq!(
            snapshot.counter(DISPATCH_TOTAL, &[("outcome", outcome)]),
            Some(1),
            "{outcome}"
        );
    }
}

#[rstest]
fn module_failures_are_counted() {
    let snapshot = recorded(|| async {
        let processor = Processor::new();
        processor.add_module(FailingModule::new("a", action::SEND, "one"));
        processor.add_module(FailingModule::new("b", action::SEND, "two"));
        let _ = processor
            .handle(action::SEND, &mut message(), &Options::new())
            .await;
    });
    assert_eq!(snapshot.counter(MODULE_FAILURES_TOTAL, &[]), Some(2));
}

#[rstest]
fn memory_resends_update_counters_and_depth() {
    let snapshot = recorded(|| async {
        let processor = Processor::new();
        processor.add_module(std::sync::Arc::new(MemoryResender::new(
            ResenderConfig::default(),
        )));
        for retries in [3, 2, 0] {
            processor
                .handle(
                    action::RESEND,
                    &mut message(),
                    &Options::new().with_retries(retries),
                )
                .await
                .expect("resend");
        }
    });

    assert_eq!(
        snapshot.counter(RESEND_SCHEDULED_TOTAL, &[("queue", "memory")]),
        Some(2)
    );
    assert_eq!(snapshot.counter(RESEND_EXHAUSTED_TOTAL, &[]), Some(1));
    assert_eq!(snapshot.gauge(RESEND_QUEUE_DEPTH), Some(2.0));
}
