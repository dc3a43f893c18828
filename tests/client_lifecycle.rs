//! Integration tests for connecting, losing and re-establishing a hub link.

use std::time::Duration;

use hubwire::{ConnectAttempt, ConnectionState, Event, HubClient, HubEvents};
use hubwire_testing::{HubConnection, MockHub};
use rstest::{fixture, rstest};
use tokio::time::timeout;

async fn next_event(events: &mut HubEvents) -> Event {
    loop {
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event should arrive")
            .expect("event channel open");
        if !matches!(
            event,
            Event::Raw(_) | Event::Sent(_) | Event::StateChanged(_)
        ) {
            return event;
        }
    }
}

async fn establish(
    hub: &MockHub,
    client: &HubClient,
    events: &mut HubEvents,
    channel: &str,
) -> HubConnection {
    let _ = client.connect("127.0.0.1", hub.addr().port(), channel);
    let mut conn = hub.accept().await.expect("accept");
    assert!(matches!(next_event(events).await, Event::Connected { .. }));
    assert!(matches!(next_event(events).await, Event::Subscribable));
    assert_eq!(
        conn.read_frame().await.expect("sub frame"),
        format!(r#"{{"sub":"{channel}"}}"#)
    );
    conn
}

#[fixture]
fn client() -> (HubClient, HubEvents) { HubClient::builder().build() }

#[rstest]
#[tokio::test]
async fn hub_closing_allows_reconnect(client: (HubClient, HubEvents)) {
    let (client, mut events) = client;
    let hub = MockHub::bind().await.expect("bind hub");
    let conn = establish(&hub, &client, &mut events, "/").await;

    drop(conn);
    assert!(matches!(next_event(&mut events).await, Event::ConnectionLost));
    // The exit hook runs before the event is emitted.
    assert_eq!(client.state(), ConnectionState::Disconnected);

    assert_eq!(client.reconnect(), ConnectAttempt::Started);
    let mut conn = hub.accept().await.expect("accept again");
    assert_eq!(conn.read_frame().await.expect("sub frame"), r#"{"sub":"/"}"#);
    assert!(client.is_connected());
}

#[rstest]
#[tokio::test]
async fn disconnect_then_connect_elsewhere(client: (HubClient, HubEvents)) {
    let (client, mut events) = client;
    let first = MockHub::bind().await.expect("bind first hub");
    let second = MockHub::bind().await.expect("bind second hub");

    let mut conn = establish(&first, &client, &mut events, "room1").await;
    client.disconnect().await;
    assert!(matches!(next_event(&mut events).await, Event::Terminated));
    assert!(conn.expect_closed().await.expect("closed").is_empty());

    let _conn = establish(&second, &client, &mut events, "room2").await;
    assert_eq!(
        client.endpoint().map(|e| e.port()),
        Some(second.addr().port())
    );
}

#[rstest]
#[tokio::test]
async fn disconnect_during_attempt_cancels_it(client: (HubClient, HubEvents)) {
    let (client, mut events) = client;
    let hub = MockHub::bind().await.expect("bind hub");

    let _ = client.connect("127.0.0.1", hub.addr().port(), "room1");
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    assert!(
        timeout(Duration::from_millis(200), next_event(&mut events))
            .await
            .is_err(),
        "cancelled attempt must not report an outcome"
    );
}

#[rstest]
#[tokio::test]
async fn connect_timeout_reports_failure() {
    // A non-routable address keeps the connect pending until the timeout.
    let (client, mut events) = HubClient::builder()
        .connect_timeout(Duration::from_millis(100))
        .build();
    let _ = client.connect("10.255.255.1", 10547, "/");

    match next_event(&mut events).await {
        Event::ConnectionFailed { reason } => assert!(!reason.is_empty()),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
