//! Dispatch behaviour seen from a host application.

use std::sync::Arc;

use as2relay::{
    DispatchError,
    ImmediateResender,
    Message,
    Options,
    Partnership,
    Processor,
    action,
};
use as2relay_testing::{FailingModule, RecordingModule};
use rstest::{fixture, rstest};

#[fixture]
fn message() -> Message { Message::new(Partnership::between("alpha", "beta")) }

#[rstest]
#[tokio::test]
async fn store_and_send_fan_out_independently(mut message: Message) {
    let processor = Processor::new();
    let storage = RecordingModule::new("storage", &[action::STORE, action::STORE_MDN]);
    let sender = RecordingModule::new("sender", &[action::SEND]);
    processor.add_module(storage.clone());
    processor.add_module(sender.clone());

    processor
        .handle(action::STORE, &mut message, &Options::new())
        .await
        .expect("stored");
    processor
        .handle(action::SEND, &mut message, &Options::new())
        .await
        .expect("sent");

    assert_eq!(storage.call_count(), 1);
    assert_eq!(sender.call_count(), 1);
    assert_eq!(sender.calls()[0].message_id, message.id());
}

#[rstest]
#[tokio::test]
async fn failures_do_not_stop_later_modules(mut message: Message) {
    let processor = Processor::new();
    let audit = RecordingModule::new("audit", &[action::SEND]);
    processor.add_module(FailingModule::new("sender", action::SEND, "connection refused"));
    processor.add_module(audit.clone());

    let err = processor
        .handle(action::SEND, &mut message, &Options::new())
        .await
        .expect_err("sender fails");
    assert_eq!(audit.call_count(), 1);
    let DispatchError::Failed { action, failures } = err else {
        panic!("expected aggregated failures");
    };
    assert_eq!(action, "send");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].module, "sender");
    assert_eq!(failures[0].error.to_string(), "connection refused");
}

#[rstest]
#[tokio::test]
async fn unknown_actions_are_unhandled(mut message: Message) {
    let processor = Processor::new();
    let sender = RecordingModule::new("sender", &[action::SEND]);
    processor.add_module(sender.clone());

    let err = processor
        .handle("archive", &mut message, &Options::new())
        .await
        .expect_err("no archiver");
    assert!(err.is_unhandled());
    assert_eq!(sender.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn removed_modules_stop_receiving(mut message: Message) {
    let processor = Processor::new();
    let sender = RecordingModule::new("sender", &[action::SEND]);
    processor.add_module(sender.clone());
    assert!(processor.remove_module(&sender));
    assert!(processor.is_empty());

    let err = processor
        .handle(action::SEND, &mut message, &Options::new())
        .await
        .expect_err("nothing registered");
    assert!(err.is_unhandled());
    assert_eq!(sender.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn immediate_resend_surfaces_sender_failure(mut message: Message) {
    let processor = Processor::new();
    processor.add_module(FailingModule::new("sender", action::SEND, "timeout"));
    processor.add_module(Arc::new(ImmediateResender::default()));

    // The resender re-dispatches `send`, which fails again: nothing loops,
    // the single resend reports the sender's failure.
    let options = Options::new().with_retries(3);
    let err = processor
        .handle(action::RESEND, &mut message, &options)
        .await
        .expect_err("send keeps failing");
    assert_eq!(err.failures().len(), 1);
    assert!(err.to_string().contains("timeout"), "{err}");
}
