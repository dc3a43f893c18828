//! Connection manager for a pub/sub hub.
//!
//! [`HubClient`] owns the connection state machine
//! (`Disconnected → Connecting → Connected`) and the public request surface.
//! Connect attempts run on spawned tasks; once a socket is live it is handed
//! to a stream worker whose read loop feeds decoded documents and library
//! notifications into the [`HubEvents`](crate::event::HubEvents) channel
//! returned by [`HubClientBuilder::build`].
//!
//! The client never reconnects on its own. After
//! [`Event::ConnectionLost`](crate::event::Event::ConnectionLost) the caller
//! decides whether to call [`HubClient::reconnect`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;

mod builder;
mod connect;
mod endpoint;
mod error;
mod runtime;

pub use builder::HubClientBuilder;
pub use endpoint::{DEFAULT_CHANNEL, DEFAULT_HUB_HOST, DEFAULT_HUB_PORT, Endpoint};
pub use error::ClientError;

use crate::{
    config::ClientConfig,
    event::{ConnectionState, Event},
    router::Router,
    worker::StreamWorker,
};

/// Outcome of [`HubClient::connect`] and [`HubClient::reconnect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum ConnectAttempt {
    /// A new attempt was started; its result arrives as an event.
    Started,
    /// An attempt is in flight or a connection is live; nothing was done.
    AlreadyActive,
    /// `reconnect` was called before any endpoint was recorded.
    NoEndpoint,
}

/// Client for a pub/sub hub.
///
/// Clones share one connection. Dropping the last clone stops any live
/// connection.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{client::HubClient, event::Event, frame::CallbackId};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), hubwire::client::ClientError> {
/// let (client, mut events) = HubClient::builder().build();
/// let _ = client.connect("127.0.0.1", 9999, "room1");
///
/// while let Some(event) = events.recv().await {
///     match event {
///         Event::Subscribable => {
///             client
///                 .subscribe(&json!({"version": {"$gt": 0.1}}), CallbackId::new(42))
///                 .await?;
///         }
///         Event::Message { id, doc } => println!("{id}: {doc}"),
///         Event::ConnectionLost => break,
///         _ => {}
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HubClient {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    router: Router,
    config: ClientConfig,
}

#[derive(Debug, Default)]
struct Inner {
    state: ConnectionState,
    endpoint: Option<Endpoint>,
    /// Bumped on every connect and disconnect so stale attempts and workers
    /// cannot touch a newer connection.
    generation: u64,
    worker: Option<StreamWorker>,
    attempt: Option<AbortHandle>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        if inner.state == state {
            return;
        }
        tracing::debug!(from = %inner.state, to = %state, "connection state changed");
        inner.state = state;
        self.router.emit(Event::StateChanged(state));
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(attempt) = inner.attempt.take() {
            attempt.abort();
        }
    }
}

#[cfg(test)]
mod tests;
