//! Tests for the stream worker read loop and writer.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use bytes::Bytes;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tracing_test::traced_test;

use super::*;
use crate::{codec::FramingError, event::HubEvents, frame::CallbackId};

struct Harness {
    worker: StreamWorker,
    peer: DuplexStream,
    events: HubEvents,
    exits: Arc<AtomicUsize>,
}

fn spawn_worker() -> Harness {
    let (local, peer) = duplex(4096);
    let (tx, events) = HubEvents::channel();
    let exits = Arc::new(AtomicUsize::new(0));
    let count = exits.clone();
    let worker = StreamWorker::spawn(
        local,
        &ClientConfig::default(),
        Router::new(tx),
        Box::new(move |termination| {
            count.fetch_add(1, Ordering::SeqCst);
            termination.event()
        }),
    );
    Harness {
        worker,
        peer,
        events,
        exits,
    }
}

async fn next_non_raw(events: &mut HubEvents) -> Event {
    loop {
        match events.recv().await.expect("event channel open") {
            Event::Raw(_) => {}
            event => return event,
        }
    }
}

#[tokio::test]
async fn inbound_message_reaches_default_sink() {
    let mut h = spawn_worker();
    h.peer
        .write_all(br#"{"id":42,"doc":{"version":0.2}}"#)
        .await
        .expect("peer write");

    match h.events.recv().await {
        Some(Event::Raw(bytes)) => assert_eq!(bytes.len(), 31),
        other => panic!("expected raw event first, got {other:?}"),
    }
    match h.events.recv().await {
        Some(Event::Message { id, doc }) => {
            assert_eq!(id, CallbackId::new(42));
            assert_eq!(doc, json!({"version": 0.2}));
        }
        other => panic!("expected message, got {other:?}"),
    }
}

#[tokio::test]
async fn two_frames_in_one_read_arrive_in_order() {
    let mut h = spawn_worker();
    h.peer
        .write_all(b"\x00{\"id\":1,\"doc\":\"a\"}\xFD\x00{\"id\":2,\"doc\":\"b\"}\xFD")
        .await
        .expect("peer write");

    let first = next_non_raw(&mut h.events).await;
    let second = next_non_raw(&mut h.events).await;
    assert!(matches!(first, Event::Message { id, .. } if id == CallbackId::new(1)));
    assert!(matches!(second, Event::Message { id, .. } if id == CallbackId::new(2)));
}

#[tokio::test]
async fn split_message_is_delivered_once_complete() {
    let mut h = spawn_worker();
    h.peer
        .write_all(b"\x00{\"id\":9,\"doc\":{\"nested\"")
        .await
        .expect("peer write");
    assert!(matches!(h.events.recv().await, Some(Event::Raw(_))));

    h.peer.write_all(b":true}}\xFD").await.expect("peer write");
    assert!(matches!(h.events.recv().await, Some(Event::Raw(_))));
    assert!(matches!(
        h.events.recv().await,
        Some(Event::Message { id, .. }) if id == CallbackId::new(9)
    ));
}

#[tokio::test]
async fn malformed_message_does_not_stop_the_loop() {
    let mut h = spawn_worker();
    h.peer
        .write_all(br#"{"doc":1}{"id":3,"doc":2}"#)
        .await
        .expect("peer write");

    assert!(matches!(
        next_non_raw(&mut h.events).await,
        Event::ProtocolError(_)
    ));
    assert!(matches!(
        next_non_raw(&mut h.events).await,
        Event::Message { id, .. } if id == CallbackId::new(3)
    ));
}

#[traced_test]
#[tokio::test]
async fn unbalanced_quote_does_not_swallow_later_frames() {
    let mut h = spawn_worker();
    h.peer
        .write_all(b"\x00{\"id\":1,\"doc\":\"abc}\xFD\x00{\"id\":2,\"doc\":1}\xFD")
        .await
        .expect("peer write");

    assert!(matches!(
        next_non_raw(&mut h.events).await,
        Event::ProtocolError(CodecError::Framing(FramingError::UnterminatedMessage { size: 19 }))
    ));
    assert!(matches!(
        next_non_raw(&mut h.events).await,
        Event::Message { id, .. } if id == CallbackId::new(2)
    ));
    assert!(logs_contain("dropping undecodable message"));
    assert!(logs_contain("policy=\"drop\""));
}

#[tokio::test]
async fn peer_close_emits_connection_lost_once() {
    let mut h = spawn_worker();
    drop(h.peer);

    assert!(matches!(h.events.recv().await, Some(Event::ConnectionLost)));
    h.worker.stop().await;
    assert_eq!(h.exits.load(Ordering::SeqCst), 1);
    assert!(h.events.recv().await.is_none(), "no further events expected");
}

#[tokio::test]
async fn stop_emits_terminated_and_closes_socket() {
    let mut h = spawn_worker();
    let writer = h.worker.writer();
    h.worker.stop().await;

    assert!(matches!(h.events.recv().await, Some(Event::Terminated)));
    assert_eq!(h.exits.load(Ordering::SeqCst), 1);

    let mut rest = Vec::new();
    h.peer.read_to_end(&mut rest).await.expect("peer read");
    assert!(rest.is_empty());

    let err = writer
        .write(Bytes::from_static(br#"{"sub":"late"}"#))
        .await
        .expect_err("write after stop must fail");
    assert!(matches!(err, ClientError::Disconnected));
}

#[tokio::test]
async fn write_frames_payload_and_reports_sent() {
    let mut h = spawn_worker();
    h.worker
        .writer()
        .write(Bytes::from_static(br#"{"sub":"room1"}"#))
        .await
        .expect("write");

    let mut frame = vec![0u8; 17];
    h.peer.read_exact(&mut frame).await.expect("peer read");
    assert_eq!(frame, b"\x00{\"sub\":\"room1\"}\xFD");
    assert!(matches!(
        h.events.recv().await,
        Some(Event::Sent(payload)) if &payload[..] == br#"{"sub":"room1"}"#
    ));
}

#[tokio::test]
async fn guard_serializes_consecutive_frames() {
    let mut h = spawn_worker();
    let writer = h.worker.writer();
    let mut guard = writer.lock().await;

    let contender = tokio::spawn({
        let writer = writer.clone();
        async move { writer.write(Bytes::from_static(b"{\"b\":2}")).await }
    });
    guard
        .write(Bytes::from_static(b"{\"a\":1}"))
        .await
        .expect("first write");
    drop(guard);
    contender
        .await
        .expect("join contender")
        .expect("second write");

    let mut wire = vec![0u8; 18];
    h.peer.read_exact(&mut wire).await.expect("peer read");
    assert_eq!(wire, b"\x00{\"a\":1}\xFD\x00{\"b\":2}\xFD");
}

#[tokio::test]
async fn empty_payload_is_rejected_without_writing() {
    let h = spawn_worker();
    let err = h
        .worker
        .writer()
        .write(Bytes::new())
        .await
        .expect_err("empty payload");
    assert!(matches!(err, ClientError::Codec(_)));
}
