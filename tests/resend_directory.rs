//! Durable directory resender against a real filesystem.

use std::{sync::Arc, time::Duration};

use as2relay::{
    DirectoryResender,
    Message,
    Options,
    Partnership,
    PollerConfig,
    Processor,
    Startable,
    action,
    clock::ManualClock,
    config::{DirectoryResenderConfig, ModuleAttributes},
    resend::{ResendRecord, ScanReport},
};
use as2relay_testing::{FailingModule, RecordingModule};
use chrono::{TimeDelta, TimeZone, Utc};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Rig {
    _root: TempDir,
    clock: Arc<ManualClock>,
    resender: Arc<DirectoryResender>,
    processor: Processor,
}

fn rig_with(dirs: &TempDir) -> (Arc<ManualClock>, Arc<DirectoryResender>) {
    let start = Utc
        .with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid instant");
    let clock = Arc::new(ManualClock::new(start));
    let mut config = DirectoryResenderConfig::new(
        dirs.path().join("resend"),
        dirs.path().join("error"),
    );
    config.timing.resend_delay = Duration::from_secs(60);
    let resender = Arc::new(DirectoryResender::with_clock(config, clock.clone()));
    (clock, resender)
}

#[fixture]
fn rig() -> Rig {
    let root = tempfile::tempdir().expect("temp dir");
    let (clock, resender) = rig_with(&root);
    let processor = Processor::new();
    processor.add_module(resender.clone());
    Rig {
        _root: root,
        clock,
        resender,
        processor,
    }
}

fn message(id: &str) -> Message { Message::with_id(id, Partnership::between("alpha", "beta")) }

async fn store(rig: &Rig, id: &str, retries: u32) {
    rig.processor
        .handle(
            action::RESEND,
            &mut message(id),
            &Options::new().with_retries(retries),
        )
        .await
        .expect("stored");
}

async fn error_files(rig: &Rig) -> Vec<std::path::PathBuf> {
    let mut entries = tokio::fs::read_dir(rig.resender.error_dir())
        .await
        .expect("error dir");
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await.expect("entry") {
        found.push(entry.path());
    }
    found
}

#[rstest]
#[tokio::test]
async fn each_request_writes_one_named_file(rig: Rig) {
    store(&rig, "<one@alpha>", 3).await;
    store(&rig, "<two@alpha>", 3).await;

    let pending = rig.resender.pending().await.expect("listing");
    let names: Vec<_> = pending
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
        .collect();
    assert_eq!(names, ["06-01-2025-12-01-00", "06-01-2025-12-01-00.1"]);

    let bytes = tokio::fs::read(&pending[0]).await.expect("read");
    let record = ResendRecord::from_bytes(&bytes).expect("decodes");
    assert_eq!(record.message.id(), "<one@alpha>");
    assert_eq!(record.resend_action, action::SEND);
    assert_eq!(record.retries, 3);
}

#[rstest]
#[tokio::test]
async fn exhausted_requests_write_nothing(rig: Rig) {
    store(&rig, "<spent@alpha>", 0).await;
    assert!(rig.resender.pending().await.expect("listing").is_empty());
}

#[rstest]
#[tokio::test]
async fn files_wait_until_due_then_resend(rig: Rig) {
    let sender = RecordingModule::new("sender", &[action::SEND]);
    rig.processor.add_module(sender.clone());
    store(&rig, "<due@alpha>", 3).await;

    rig.clock.advance(TimeDelta::seconds(59));
    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report, ScanReport { waiting: 1, ..ScanReport::default() });
    assert_eq!(sender.call_count(), 0);

    rig.clock.advance(TimeDelta::seconds(1));
    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report, ScanReport { resent: 1, ..ScanReport::default() });

    let calls = sender.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message_id, "<due@alpha>");
    assert_eq!(calls[0].options.retries(), Some(2));
    assert!(rig.resender.pending().await.expect("listing").is_empty());
}

#[rstest]
#[tokio::test]
async fn failed_resend_moves_file_to_error_dir(rig: Rig) {
    rig.processor
        .add_module(FailingModule::new("sender", action::SEND, "partner down"));
    store(&rig, "<fails@alpha>", 3).await;
    rig.clock.advance(TimeDelta::minutes(5));

    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report.failed, 1);
    assert!(rig.resender.pending().await.expect("listing").is_empty());
    let quarantined = error_files(&rig).await;
    assert_eq!(quarantined.len(), 1);
    assert_eq!(
        quarantined[0].file_name().and_then(|n| n.to_str()),
        Some("06-01-2025-12-01-00")
    );
}

#[rstest]
#[tokio::test]
async fn unrecognised_files_are_quarantined(rig: Rig) {
    tokio::fs::create_dir_all(rig.resender.resend_dir())
        .await
        .expect("dir");
    tokio::fs::write(rig.resender.resend_dir().join("notes.txt"), b"hello")
        .await
        .expect("write");

    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report.failed, 1);
    assert_eq!(error_files(&rig).await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn stored_record_without_retries_is_quarantined(rig: Rig) {
    let record = ResendRecord {
        resend_action: action::SEND.to_owned(),
        retries: 0,
        message: message("<zero@alpha>"),
    };
    tokio::fs::create_dir_all(rig.resender.resend_dir())
        .await
        .expect("dir");
    tokio::fs::write(
        rig.resender.resend_dir().join("01-01-2020-00-00-00"),
        record.to_bytes().expect("encodes"),
    )
    .await
    .expect("write");
    let sender = RecordingModule::new("sender", &[action::SEND]);
    rig.processor.add_module(sender.clone());

    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report.failed, 1);
    assert_eq!(sender.call_count(), 0);
    assert_eq!(error_files(&rig).await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn empty_files_are_left_for_a_later_scan(rig: Rig) {
    tokio::fs::create_dir_all(rig.resender.resend_dir())
        .await
        .expect("dir");
    tokio::fs::write(rig.resender.resend_dir().join("01-01-2020-00-00-00"), b"")
        .await
        .expect("write");

    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report, ScanReport { busy: 1, ..ScanReport::default() });
    assert_eq!(rig.resender.pending().await.expect("listing").len(), 1);
}

#[rstest]
#[tokio::test]
async fn pending_files_survive_a_restart() {
    let root = tempfile::tempdir().expect("temp dir");
    {
        let (_, first) = rig_with(&root);
        let processor = Processor::new();
        processor.add_module(first.clone());
        processor
            .handle(
                action::RESEND,
                &mut message("<durable@alpha>"),
                &Options::new().with_retries(2),
            )
            .await
            .expect("stored");
    }

    let (clock, second) = rig_with(&root);
    clock.advance(TimeDelta::minutes(2));
    let sender = RecordingModule::new("sender", &[action::SEND]);
    let processor = Processor::new();
    processor.add_module(sender.clone());
    processor.add_module(second.clone());
    assert_eq!(processor.start_active_modules().await, 1);

    // The first scan runs as soon as the poller starts.
    for _ in 0..250 {
        if sender.call_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(sender.call_count(), 1);
    assert_eq!(sender.calls()[0].message_id, "<durable@alpha>");
    assert_eq!(processor.stop_active_modules().await, 1);
}

#[rstest]
#[tokio::test]
async fn start_creates_both_directories() {
    let root = tempfile::tempdir().expect("temp dir");
    let attrs: ModuleAttributes = [
        ("resenddir", root.path().join("out").display().to_string()),
        ("errordir", root.path().join("bad").display().to_string()),
        ("resenddelay", "30".to_owned()),
        ("pollinginterval", "3600".to_owned()),
    ]
    .into_iter()
    .collect();
    let config = attrs.directory_resender_config().expect("config");
    assert_eq!(config.timing.resend_delay, Duration::from_secs(30));
    assert_eq!(
        config.timing.polling,
        PollerConfig {
            initial_delay: Duration::ZERO,
            period: Duration::from_secs(3600),
        }
    );

    let resender = Arc::new(DirectoryResender::new(config));
    let processor = Processor::new();
    processor.add_module(resender.clone());
    resender.start(&processor).await.expect("started");
    assert!(root.path().join("out").is_dir());
    assert!(root.path().join("bad").is_dir());
    resender.stop().await.expect("stopped");
}

#[rstest]
#[tokio::test]
async fn files_locked_by_a_writer_are_left_in_place(rig: Rig) {
    let sender = RecordingModule::new("sender", &[action::SEND]);
    rig.processor.add_module(sender.clone());
    store(&rig, "<locked@alpha>", 3).await;
    rig.clock.advance(TimeDelta::minutes(5));

    let pending = rig.resender.pending().await.expect("listing");
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&pending[0])
        .expect("open");
    let mut lock = fd_lock::RwLock::new(file);
    let guard = lock.write().expect("lock");

    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report, ScanReport { busy: 1, ..ScanReport::default() });
    assert_eq!(sender.call_count(), 0);
    assert_eq!(rig.resender.pending().await.expect("listing"), pending);

    drop(guard);
    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report, ScanReport { resent: 1, ..ScanReport::default() });
    assert_eq!(sender.call_count(), 1);
}

#[rstest]
#[tokio::test]
async fn a_bad_file_does_not_stop_the_scan(rig: Rig) {
    let sender = RecordingModule::new("sender", &[action::SEND]);
    rig.processor.add_module(sender.clone());
    tokio::fs::create_dir_all(rig.resender.resend_dir())
        .await
        .expect("dir");
    // Sorts before the stored record and fails to decode.
    tokio::fs::write(rig.resender.resend_dir().join("01-01-2020-00-00-00"), b"garbage")
        .await
        .expect("write");
    store(&rig, "<good@alpha>", 3).await;
    rig.clock.advance(TimeDelta::minutes(5));

    let report = rig.resender.poll_once(&rig.processor).await;
    assert_eq!(report, ScanReport { resent: 1, failed: 1, ..ScanReport::default() });
    assert_eq!(sender.calls()[0].message_id, "<good@alpha>");
    assert!(rig.resender.pending().await.expect("listing").is_empty());
    assert_eq!(error_files(&rig).await.len(), 1);
}
