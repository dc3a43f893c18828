//! Public operations of [`HubClient`].

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::Instrument;

use super::{ClientError, ConnectAttempt, Endpoint, HubClient, HubClientBuilder};
use crate::{
    event::ConnectionState,
    frame::{CallbackId, OutboundFrame},
    router::SinkReceiver,
    worker::FrameWriter,
};

impl HubClient {
    /// Start building a client.
    pub fn builder() -> HubClientBuilder { HubClientBuilder::new() }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { self.shared.lock().state }

    /// Returns true while a worker owns a live socket.
    #[must_use]
    pub fn is_connected(&self) -> bool { self.state() == ConnectionState::Connected }

    /// The endpoint of the most recent connect call, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<Endpoint> { self.shared.lock().endpoint.clone() }

    /// Connect to `host:port` and select `channel` once connected.
    ///
    /// See [`connect_to`](Self::connect_to).
    pub fn connect(
        &self,
        host: impl Into<String>,
        port: u16,
        channel: impl Into<String>,
    ) -> ConnectAttempt {
        self.connect_to(Endpoint::new(host, port, channel))
    }

    /// Connect to the default hub and select the root channel.
    pub fn connect_default(&self) -> ConnectAttempt { self.connect_to(Endpoint::default()) }

    /// Connect to the default hub and select `channel`.
    pub fn connect_channel(&self, channel: impl Into<String>) -> ConnectAttempt {
        self.connect_to(Endpoint::default_hub(channel))
    }

    /// Start a connect attempt to `endpoint`.
    ///
    /// Returns immediately; the outcome arrives as
    /// [`Event::Connected`](crate::event::Event::Connected) followed by
    /// [`Event::Subscribable`](crate::event::Event::Subscribable), or as
    /// [`Event::ConnectionFailed`](crate::event::Event::ConnectionFailed). On
    /// success a `sub` frame for the endpoint's channel is written before any
    /// other frame.
    ///
    /// While an attempt is in flight or a connection is live this does
    /// nothing and returns [`ConnectAttempt::AlreadyActive`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn connect_to(&self, endpoint: Endpoint) -> ConnectAttempt {
        let mut inner = self.shared.lock();
        if inner.state != ConnectionState::Disconnected {
            tracing::info!(
                state = %inner.state,
                endpoint = %endpoint,
                "connection already active; ignoring connect"
            );
            return ConnectAttempt::AlreadyActive;
        }
        inner.generation += 1;
        let generation = inner.generation;
        inner.endpoint = Some(endpoint.clone());
        self.shared.set_state(&mut inner, ConnectionState::Connecting);

        let span = tracing::info_span!(
            "hub.connect",
            peer.addr = %format_args!("{}:{}", endpoint.host(), endpoint.port()),
            channel = endpoint.channel()
        );
        let task = tokio::spawn(
            Arc::clone(&self.shared)
                .run_attempt(endpoint, generation)
                .instrument(span),
        );
        inner.attempt = Some(task.abort_handle());
        ConnectAttempt::Started
    }

    /// Connect again to the most recently used endpoint.
    ///
    /// Returns [`ConnectAttempt::NoEndpoint`] if `connect` was never called.
    pub fn reconnect(&self) -> ConnectAttempt {
        let Some(endpoint) = self.endpoint() else {
            tracing::info!("no endpoint recorded; ignoring reconnect");
            return ConnectAttempt::NoEndpoint;
        };
        self.connect_to(endpoint)
    }

    /// Stop the connection and wait for its read loop to finish.
    ///
    /// Cancels an in-flight attempt. A live worker emits
    /// [`Event::Terminated`](crate::event::Event::Terminated) as it exits.
    pub async fn disconnect(&self) {
        let worker = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            if let Some(attempt) = inner.attempt.take() {
                attempt.abort();
            }
            self.shared.set_state(&mut inner, ConnectionState::Disconnected);
            inner.worker.take()
        };
        if let Some(worker) = worker {
            tracing::info!("disconnecting");
            worker.stop().await;
        }
    }

    /// Select a channel on the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] unless connected, or an I/O
    /// error if the write fails.
    pub async fn sub(&self, channel: impl Into<String>) -> Result<(), ClientError> {
        self.send(&OutboundFrame::Sub {
            channel: channel.into(),
        })
        .await
    }

    /// Subscribe to documents matching `filter`, delivered under `id`.
    ///
    /// Matching documents arrive on the sink registered for `id`, or as
    /// [`Event::Message`](crate::event::Event::Message) when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialize`] if `filter` is not representable
    /// as JSON, [`ClientError::NotConnected`] unless connected, or an I/O
    /// error if the write fails.
    pub async fn subscribe<Q>(&self, filter: &Q, id: CallbackId) -> Result<(), ClientError>
    where
        Q: Serialize + ?Sized,
    {
        self.send(&OutboundFrame::subscribe(filter, id)?).await
    }

    /// Register a dedicated sink for `id`, then subscribe with `filter`.
    ///
    /// The sink is removed again if the subscribe request fails.
    ///
    /// # Errors
    ///
    /// As for [`subscribe`](Self::subscribe).
    pub async fn subscribe_routed<Q>(
        &self,
        filter: &Q,
        id: CallbackId,
    ) -> Result<SinkReceiver, ClientError>
    where
        Q: Serialize + ?Sized,
    {
        let frame = OutboundFrame::subscribe(filter, id)?;
        let sink = self.shared.router.sinks().register(id);
        if let Err(e) = self.send(&frame).await {
            self.shared.router.sinks().unregister(id);
            return Err(e);
        }
        Ok(sink)
    }

    /// Cancel the subscription for `id` and remove its sink, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] unless connected, or an I/O
    /// error if the write fails. The sink is kept when the request fails.
    pub async fn unsubscribe(&self, id: CallbackId) -> Result<(), ClientError> {
        self.send(&OutboundFrame::Unsubscribe { id }).await?;
        self.shared.router.sinks().unregister(id);
        Ok(())
    }

    /// Publish `doc` to the selected channel.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialize`] if `doc` is not representable as
    /// JSON, [`ClientError::NotConnected`] unless connected, or an I/O error
    /// if the write fails.
    pub async fn publish<D>(&self, doc: &D) -> Result<(), ClientError>
    where
        D: Serialize + ?Sized,
    {
        self.send(&OutboundFrame::publish(doc)?).await
    }

    /// Frame and write an arbitrary payload.
    ///
    /// The payload is not validated; the hub ignores anything that is not
    /// one of the documented request shapes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] unless connected, a codec error
    /// for an empty or oversized payload, or an I/O error if the write fails.
    pub async fn write_raw(&self, payload: impl Into<Bytes>) -> Result<(), ClientError> {
        let writer = self.writer()?;
        writer.write(payload.into()).await
    }

    /// Register a dedicated sink for `id` without sending anything.
    ///
    /// Replaces any sink already registered for `id`.
    #[must_use]
    pub fn route(&self, id: CallbackId) -> SinkReceiver {
        self.shared.router.sinks().register(id)
    }

    /// Remove the sink for `id`. Returns true if one was registered.
    pub fn unroute(&self, id: CallbackId) -> bool {
        self.shared.router.sinks().unregister(id)
    }

    /// Returns true if a sink is registered for `id`.
    #[must_use]
    pub fn is_routed(&self, id: CallbackId) -> bool {
        self.shared.router.sinks().contains(id)
    }

    async fn send(&self, frame: &OutboundFrame) -> Result<(), ClientError> {
        let payload = frame.to_payload()?;
        let writer = self.writer()?;
        tracing::debug!(frame.kind = frame.kind().as_str(), "sending frame");
        writer.write(payload).await
    }

    fn writer(&self) -> Result<FrameWriter, ClientError> {
        let inner = self.shared.lock();
        match (&inner.state, &inner.worker) {
            (ConnectionState::Connected, Some(worker)) => Ok(worker.writer()),
            _ => Err(ClientError::NotConnected),
        }
    }
}
