#![cfg(feature = "metrics")]
//! Tests for `hubwire` metrics helpers.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.
use hubwire::metrics::{self, Direction};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[rstest]
#[case(Direction::Inbound, "inbound")]
#[case(Direction::Outbound, "outbound")]
fn frame_metric_is_labelled_by_direction(#[case] direction: Direction, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    ::metrics::with_local_recorder(&recorder, || metrics::inc_frames(direction));

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == metrics::FRAMES_PROCESSED
            && k.key()
                .labels()
                .any(|l| l.key() == "direction" && l.value() == label)
            && matches!(v, DebugValue::Counter(c) if *c > 0)
    });
    assert!(found, "{label} frames metric not recorded");
}

#[rstest]
#[case(1)]
#[case(3)]
fn error_metric_counts_by_kind(#[case] expected: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    ::metrics::with_local_recorder(&recorder, || {
        (0..expected).for_each(|_| metrics::inc_errors("protocol"));
    });

    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(k, _, _, v)| {
            k.key().name() == metrics::ERRORS_TOTAL
                && k.key()
                    .labels()
                    .any(|l| l.key() == "kind" && l.value() == "protocol")
                && matches!(v, DebugValue::Counter(c) if *c == expected)
        }),
        "expected {expected} protocol errors, got {metrics:#?}"
    );
}

#[test]
fn connection_gauge_tracks_open_connections() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    ::metrics::with_local_recorder(&recorder, || {
        metrics::inc_connections();
        metrics::inc_connections();
        metrics::dec_connections();
    });

    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(k, _, _, v)| {
            k.key().name() == metrics::CONNECTIONS_ACTIVE
                && matches!(v, DebugValue::Gauge(g) if (g.0 - 1.0).abs() < f64::EPSILON)
        }),
        "expected one active connection, got {metrics:#?}"
    );
}
