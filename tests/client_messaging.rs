//! Integration tests for subscribing, publishing and receiving documents.

use std::time::Duration;

use futures::StreamExt;
use hubwire::{CallbackId, Event, HubClient, HubEvents};
use hubwire_testing::{HubConnection, MockHub, chunk, frame, split_frames};
use serde::Serialize;
use serde_json::json;
use tokio::time::timeout;

async fn connected(channel: &str) -> (HubClient, HubEvents, HubConnection) {
    let hub = MockHub::bind().await.expect("bind hub");
    let (client, events) = HubClient::builder().build();
    let _ = client.connect("127.0.0.1", hub.addr().port(), channel);
    let mut conn = hub.accept().await.expect("accept");
    conn.read_frame().await.expect("sub frame");
    (client, events, conn)
}

async fn next_message(events: &mut HubEvents) -> (CallbackId, serde_json::Value) {
    loop {
        let event = timeout(Duration::from_secs(5), events.next())
            .await
            .expect("event should arrive")
            .expect("event channel open");
        if let Event::Message { id, doc } = event {
            return (id, doc);
        }
    }
}

#[tokio::test]
async fn subscription_round_trip() {
    let (client, mut events, mut conn) = connected("room1").await;

    client
        .subscribe(&json!({"version": {"$gt": 0.1}}), CallbackId::new(42))
        .await
        .expect("subscribe");
    assert_eq!(
        conn.read_json().await.expect("subscribe frame"),
        json!({"name": "subscribe", "query": {"version": {"$gt": 0.1}}, "id": 42})
    );

    conn.deliver(42, &json!({"version": 0.2}))
        .await
        .expect("deliver");
    assert_eq!(
        next_message(&mut events).await,
        (CallbackId::new(42), json!({"version": 0.2}))
    );
}

#[tokio::test]
async fn typed_documents_are_published() {
    #[derive(Serialize)]
    struct Release {
        version: f64,
        author: String,
    }

    let (client, _events, mut conn) = connected("room1").await;
    client
        .publish(&Release {
            version: 0.2,
            author: "a".into(),
        })
        .await
        .expect("publish");

    assert_eq!(
        conn.read_frame().await.expect("publish frame"),
        r#"{"name":"publish","doc":{"version":0.2,"author":"a"}}"#
    );
}

#[tokio::test]
async fn messages_split_across_writes_are_reassembled() {
    let (_client, mut events, mut conn) = connected("room1").await;
    let mut stream = frame(br#"{"id":1,"doc":{"text":"a}b{c"}}"#);
    stream.extend(frame(br#"{"id":2,"doc":[1,2,3]}"#));

    for piece in chunk(&stream, 3) {
        conn.send_raw(&piece).await.expect("send piece");
        tokio::task::yield_now().await;
    }

    assert_eq!(
        next_message(&mut events).await,
        (CallbackId::new(1), json!({"text": "a}b{c"}))
    );
    assert_eq!(
        next_message(&mut events).await,
        (CallbackId::new(2), json!([1, 2, 3]))
    );
}

#[tokio::test]
async fn routed_sinks_receive_their_documents_in_order() {
    let (client, mut events, mut conn) = connected("room1").await;
    let mut alerts = client
        .subscribe_routed(&json!({"level": "alert"}), CallbackId::new(1))
        .await
        .expect("subscribe alerts");
    client
        .subscribe(&json!({"level": "info"}), CallbackId::new(2))
        .await
        .expect("subscribe info");

    for n in 0..3 {
        conn.deliver(1, &json!({"n": n})).await.expect("deliver");
        conn.deliver(2, &json!({"n": n})).await.expect("deliver");
    }

    for n in 0..3 {
        assert_eq!(alerts.next().await, Some(json!({"n": n})));
        assert_eq!(
            next_message(&mut events).await,
            (CallbackId::new(2), json!({"n": n}))
        );
    }
}

#[tokio::test]
async fn concurrent_publishers_never_interleave_frames() {
    let (client, _events, mut conn) = connected("room1").await;

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let client = client.clone();
            tokio::spawn(async move { client.publish(&json!({ "n": n })).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("publish");
    }

    let mut seen = Vec::new();
    for _ in 0..8 {
        let value = conn.read_json().await.expect("publish frame");
        assert_eq!(value["name"], "publish");
        seen.push(value["doc"]["n"].as_i64().expect("n"));
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn broken_frame_does_not_block_later_messages() {
    let (_client, mut events, mut conn) = connected("room1").await;
    let mut stream = frame(br#"{"id":1,"doc":"abc}"#);
    stream.extend(frame(br#"{"id":2,"doc":{"ok":true}}"#));
    conn.send_raw(&stream).await.expect("send frames");

    let mut dropped = 0;
    let message = loop {
        match timeout(Duration::from_secs(5), events.next())
            .await
            .expect("event should arrive")
            .expect("event channel open")
        {
            Event::ProtocolError(_) => dropped += 1,
            Event::Message { id, doc } => break (id, doc),
            _ => {}
        }
    };
    assert_eq!(dropped, 1);
    assert_eq!(message, (CallbackId::new(2), json!({"ok": true})));
}

#[tokio::test]
async fn frames_written_before_disconnect_reach_the_hub() {
    let (client, _events, mut conn) = connected("room1").await;
    for n in 0..3 {
        client.publish(&json!({ "n": n })).await.expect("publish");
    }
    client.disconnect().await;

    let rest = conn.expect_closed().await.expect("client closes");
    let frames = split_frames(&rest);
    assert_eq!(frames.len(), 3);
    for (n, payload) in frames.iter().enumerate() {
        let value: serde_json::Value = serde_json::from_slice(payload).expect("json frame");
        assert_eq!(value, json!({"name": "publish", "doc": {"n": n}}));
    }
}
