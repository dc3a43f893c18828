//! Shared test helpers for client tests.

use std::time::Duration;

use hubwire_testing::{HubConnection, MockHub};
use tokio::time::timeout;

use crate::{
    client::HubClient,
    event::{Event, HubEvents},
};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for the next event that is not raw traffic, a sent notice or a
/// state change.
pub async fn next_event(events: &mut HubEvents) -> Event {
    loop {
        let event = timeout(STEP_TIMEOUT, events.recv())
            .await
            .expect("event should arrive")
            .expect("event channel open");
        match event {
            Event::Raw(_) | Event::Sent(_) | Event::StateChanged(_) => {}
            other => return other,
        }
    }
}

/// Connect a client to a fresh mock hub and consume the channel selection.
pub async fn connected_client(channel: &str) -> (HubClient, HubEvents, MockHub, HubConnection) {
    let hub = MockHub::bind().await.expect("bind mock hub");
    let (client, mut events) = HubClient::builder().build();
    let addr = hub.addr();
    let _ = client.connect(addr.ip().to_string(), addr.port(), channel);
    let mut server = hub.accept().await.expect("accept client");

    assert!(matches!(next_event(&mut events).await, Event::Connected { .. }));
    assert!(matches!(next_event(&mut events).await, Event::Subscribable));
    let sub = server.read_frame().await.expect("channel selection");
    assert_eq!(sub, format!(r#"{{"sub":"{channel}"}}"#));
    (client, events, hub, server)
}
