//! Assertions over a `metrics-util` debugging recorder.
//!
//! Snapshotting a [`Snapshotter`] resets its counters, so take one
//! [`MetricsSnapshot`] after the code under test has run and query that.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Creates a debugging recorder and snapshotter for metrics testing.
pub fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

/// Metric values captured by a single snapshot.
#[derive(Debug, Default)]
pub struct MetricsSnapshot {
    entries: Vec<(String, Vec<(String, String)>, DebugValue)>,
}

impl MetricsSnapshot {
    /// Capture every metric recorded so far.
    pub fn take(snapshotter: &Snapshotter) -> Self {
        let entries = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, value)| {
                let key = key.key();
                let labels = key
                    .labels()
                    .map(|l| (l.key().to_owned(), l.value().to_owned()))
                    .collect();
                (key.name().to_owned(), labels, value)
            })
            .collect();
        Self { entries }
    }

    /// Value of counter `name` carrying every `(key, value)` label in `labels`.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.entries.iter().find_map(|(metric, have, value)| {
            let labelled = labels
                .iter()
                .all(|(k, v)| have.iter().any(|(hk, hv)| hk == k && hv == v));
            match value {
                DebugValue::Counter(count) if metric == name && labelled => Some(*count),
                _ => None,
            }
        })
    }

    /// Value of gauge `name`.
    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.entries.iter().find_map(|(metric, _, value)| match value {
            DebugValue::Gauge(gauge) if metric == name => Some(gauge.0),
            _ => None,
        })
    }
}
