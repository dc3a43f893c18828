//! Events delivered to the application and the connection state machine.
//!
//! Library notifications (state changes, raw traffic, protocol errors) and
//! application documents share one ordered channel, drained through
//! [`HubEvents`].

use std::{
    fmt,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{codec::CodecError, frame::CallbackId};

/// Connection state owned by [`HubClient`](crate::client::HubClient).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket and no attempt in flight.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A stream worker owns a live socket.
    Connected,
}

impl ConnectionState {
    /// Returns the state name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Notification delivered to the application.
#[derive(Debug)]
pub enum Event {
    /// Bytes returned by a single socket read, before decoding.
    Raw(Bytes),
    /// A socket to the hub is live.
    Connected {
        /// Host name as supplied to `connect`.
        host: String,
        /// Resolved address of the hub.
        peer: SocketAddr,
    },
    /// A connect attempt failed; the state is back to `Disconnected`.
    ConnectionFailed {
        /// Human-readable cause.
        reason: String,
    },
    /// The hub closed the stream or the socket failed while connected.
    ConnectionLost,
    /// The connection was stopped locally.
    Terminated,
    /// Subscriptions can now be issued.
    Subscribable,
    /// An inbound message was dropped.
    ProtocolError(CodecError),
    /// A document delivered for a callback id with no dedicated sink.
    Message {
        /// Callback id carried by the envelope.
        id: CallbackId,
        /// Delivered document.
        doc: Value,
    },
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// A frame was written; carries the payload without wire markers.
    Sent(Bytes),
}

impl Event {
    /// Returns true for events that end a live connection.
    #[must_use]
    pub fn is_disconnect(&self) -> bool { matches!(self, Self::ConnectionLost | Self::Terminated) }
}

pub(crate) type EventSender = mpsc::UnboundedSender<Event>;

/// Receiving end of the client's event channel.
///
/// Events arrive in the order they were produced. The stream ends once the
/// [`HubClient`](crate::client::HubClient) and every worker it started have
/// been dropped.
#[derive(Debug)]
pub struct HubEvents {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl HubEvents {
    pub(crate) fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next event.
    ///
    /// Returns `None` when no producer remains.
    pub async fn recv(&mut self) -> Option<Event> { self.rx.recv().await }

    /// Return the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> { self.rx.try_recv().ok() }
}

impl Stream for HubEvents {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
