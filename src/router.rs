//! Routing of inbound envelopes to application sinks.
//!
//! Every decoded message is an [`Envelope`] `{id, doc}`. A document whose
//! callback id has a registered sink is delivered there; anything else goes
//! to the default sink, the client's event channel, as [`Event::Message`].

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use dashmap::DashMap;
use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    codec::{CodecError, ProtocolError},
    event::{Event, EventSender},
    frame::CallbackId,
    metrics,
};

/// A decoded inbound message.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Callback id selecting the sink.
    pub id: CallbackId,
    /// Delivered document.
    pub doc: Value,
}

impl Envelope {
    /// Parse an envelope from one extracted message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidJson`] if `bytes` is not a JSON object,
    /// [`ProtocolError::MissingField`] if `id` or `doc` is absent, and
    /// [`ProtocolError::InvalidField`] if `id` is not an integer.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubwire::{frame::CallbackId, router::Envelope};
    ///
    /// let envelope =
    ///     Envelope::parse(br#"{"id":42,"doc":{"version":0.2}}"#).expect("valid envelope");
    /// assert_eq!(envelope.id, CallbackId::new(42));
    /// assert_eq!(envelope.doc["version"], 0.2);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ProtocolError::InvalidJson {
                reason: e.to_string(),
            })?;
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::InvalidJson {
                reason: "message is not a JSON object".to_owned(),
            });
        };
        let id = fields
            .get("id")
            .ok_or(ProtocolError::MissingField { field: "id" })?
            .as_i64()
            .ok_or(ProtocolError::InvalidField {
                field: "id",
                expected: "integer",
            })?;
        let doc = fields
            .remove("doc")
            .ok_or(ProtocolError::MissingField { field: "doc" })?;
        Ok(Self {
            id: CallbackId::new(id),
            doc,
        })
    }
}

/// Receiving end of a sink registered for one callback id.
#[derive(Debug)]
pub struct SinkReceiver {
    id: CallbackId,
    rx: mpsc::UnboundedReceiver<Value>,
}

impl SinkReceiver {
    /// Callback id this sink was registered for.
    #[must_use]
    pub fn id(&self) -> CallbackId { self.id }

    /// Wait for the next document.
    ///
    /// Returns `None` once the sink has been unregistered or replaced and
    /// every queued document has been received.
    pub async fn recv(&mut self) -> Option<Value> { self.rx.recv().await }

    /// Return the next document if one is already queued.
    pub fn try_recv(&mut self) -> Option<Value> { self.rx.try_recv().ok() }
}

impl Stream for SinkReceiver {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Registry of dedicated sinks keyed by callback id.
///
/// A dropped [`SinkReceiver`] leaves a closed sender behind, pruned the next
/// time a document for that id arrives.
#[derive(Debug, Default)]
pub(crate) struct SinkRegistry(DashMap<CallbackId, mpsc::UnboundedSender<Value>>);

impl SinkRegistry {
    /// Register a dedicated sink for `id`, replacing any previous one.
    pub(crate) fn register(&self, id: CallbackId) -> SinkReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.0.insert(id, tx).is_some() {
            tracing::debug!(callback.id = %id, "replaced existing sink");
        }
        tracing::debug!(callback.id = %id, sinks = self.len(), "registered sink");
        SinkReceiver { id, rx }
    }

    /// Remove the sink for `id`. Returns true if one was registered.
    pub(crate) fn unregister(&self, id: CallbackId) -> bool { self.0.remove(&id).is_some() }

    pub(crate) fn contains(&self, id: CallbackId) -> bool { self.0.contains_key(&id) }

    pub(crate) fn len(&self) -> usize { self.0.len() }

    /// Hand `doc` to the live sink for `id`.
    ///
    /// Returns the document if there is no sink or its receiver was dropped,
    /// pruning the dead entry in the latter case.
    fn offer(&self, id: CallbackId, doc: Value) -> Option<Value> {
        let undelivered = match self.0.get(&id) {
            Some(sink) => sink.send(doc).err().map(|err| err.0),
            None => return Some(doc),
        };
        if undelivered.is_some() && self.0.remove_if(&id, |_, sink| sink.is_closed()).is_some() {
            tracing::debug!(callback.id = %id, "pruned sink with dropped receiver");
        }
        undelivered
    }
}

/// Dispatches envelopes and library events.
///
/// Cloning is cheap; clones share the sink registry and event channel.
#[derive(Clone, Debug)]
pub(crate) struct Router {
    sinks: Arc<SinkRegistry>,
    events: EventSender,
}

impl Router {
    pub(crate) fn new(events: EventSender) -> Self {
        Self {
            sinks: Arc::new(SinkRegistry::default()),
            events,
        }
    }

    /// The registry of dedicated sinks.
    pub(crate) fn sinks(&self) -> &SinkRegistry { &self.sinks }

    /// Surface a library event on the shared channel.
    pub(crate) fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::trace!("event receiver dropped; discarding event");
        }
    }

    /// Parse one extracted message and deliver it.
    ///
    /// A malformed message is dropped and reported as
    /// [`Event::ProtocolError`].
    pub(crate) fn dispatch(&self, message: &[u8]) {
        match Envelope::parse(message) {
            Ok(envelope) => self.route(envelope),
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed message");
                metrics::inc_errors("protocol");
                self.emit(Event::ProtocolError(CodecError::Protocol(err)));
            }
        }
    }

    /// Deliver `envelope` to its sink, or to the default sink.
    pub(crate) fn route(&self, envelope: Envelope) {
        let Envelope { id, doc } = envelope;
        if let Some(doc) = self.sinks.offer(id, doc) {
            self.emit(Event::Message { id, doc });
        }
    }
}
