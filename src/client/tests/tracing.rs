//! Tests for client tracing spans.
//!
//! `#[traced_test]` captures formatted output; span names appear as context
//! prefixes on the events logged inside them.

use rstest::rstest;
use serde_json::json;
use tracing_test::traced_test;

use super::helpers::{connected_client, next_event};
use crate::{client::HubClient, event::Event, frame::CallbackId};

fn assert_line(lines: &[&str], needles: &[&str]) -> Result<(), String> {
    lines
        .iter()
        .find(|line| needles.iter().all(|needle| line.contains(needle)))
        .map(|_| ())
        .ok_or_else(|| format!("no line containing {needles:?} in:\n{}", lines.join("\n")))
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn connect_logs_inside_connect_span() {
    let (client, _events, hub, _server) = connected_client("room1").await;
    let peer = hub.addr().to_string();
    drop(client);

    logs_assert(|lines: &[&str]| assert_line(lines, &["hub.connect", &peer, "connected"]));
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn failed_connect_logs_reason() {
    let (client, mut events) = HubClient::builder().build();
    let _ = client.connect("127.0.0.1", 1, "room1");
    assert!(matches!(
        next_event(&mut events).await,
        Event::ConnectionFailed { .. }
    ));

    logs_assert(|lines: &[&str]| assert_line(lines, &["hub.connect", "connection failed"]));
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn malformed_messages_are_logged_inside_read_loop_span() {
    let (_client, mut events, _hub, mut server) = connected_client("room1").await;
    server
        .send_raw(b"\x00{\"id\":\"x\",\"doc\":1}\xFD")
        .await
        .expect("hub write");
    assert!(matches!(
        next_event(&mut events).await,
        Event::ProtocolError(_)
    ));

    logs_assert(|lines: &[&str]| {
        assert_line(lines, &["hub.read_loop", "dropping malformed message"])
    });
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn requests_log_frame_kind() {
    let (client, _events, _hub, _server) = connected_client("room1").await;
    client
        .subscribe(&json!({}), CallbackId::new(1))
        .await
        .expect("subscribe");

    assert!(logs_contain("frame.kind=\"subscribe\""));
}
