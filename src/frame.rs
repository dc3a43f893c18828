//! Outbound protocol frames and their JSON payloads.
//!
//! Each [`OutboundFrame`] renders to the JSON document the hub expects;
//! [`HubCodec`](crate::codec::HubCodec) then wraps the rendered bytes in
//! wire markers.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-chosen identifier correlating a subscription with its deliveries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(i64);

impl CallbackId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self { Self(id) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 { self.0 }
}

impl From<i64> for CallbackId {
    fn from(id: i64) -> Self { Self(id) }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Discriminant of an [`OutboundFrame`], used for logging and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Channel selection.
    Sub,
    /// Filtered subscription.
    Subscribe,
    /// Subscription removal.
    Unsubscribe,
    /// Document publication.
    Publish,
}

impl FrameKind {
    /// Returns the kind as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Publish => "publish",
        }
    }
}

/// A request sent to the hub.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundFrame {
    /// Attach the connection to a named channel.
    Sub {
        /// Channel name.
        channel: String,
    },
    /// Subscribe to documents matching `query`, delivered under `id`.
    Subscribe {
        /// Filter document evaluated by the hub.
        query: Value,
        /// Identifier the hub attaches to matching deliveries.
        id: CallbackId,
    },
    /// Cancel the subscription registered under `id`.
    Unsubscribe {
        /// Identifier of the subscription to remove.
        id: CallbackId,
    },
    /// Publish a document to the current channel.
    Publish {
        /// Document to publish.
        doc: Value,
    },
}

#[derive(Serialize)]
struct SubPayload<'a> {
    sub: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "name", rename_all = "lowercase")]
enum RequestPayload<'a> {
    Subscribe { query: &'a Value, id: CallbackId },
    Unsubscribe { id: CallbackId },
    Publish { doc: &'a Value },
}

impl OutboundFrame {
    /// Build a subscribe frame from any serializable filter.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if `filter` cannot be represented as JSON.
    pub fn subscribe<Q: Serialize + ?Sized>(
        filter: &Q,
        id: CallbackId,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::Subscribe {
            query: serde_json::to_value(filter)?,
            id,
        })
    }

    /// Build a publish frame from any serializable document.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if `doc` cannot be represented as JSON.
    pub fn publish<D: Serialize + ?Sized>(doc: &D) -> Result<Self, serde_json::Error> {
        Ok(Self::Publish {
            doc: serde_json::to_value(doc)?,
        })
    }

    /// Return this frame's kind.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Sub { .. } => FrameKind::Sub,
            Self::Subscribe { .. } => FrameKind::Subscribe,
            Self::Unsubscribe { .. } => FrameKind::Unsubscribe,
            Self::Publish { .. } => FrameKind::Publish,
        }
    }

    /// Render the JSON payload carried inside the wire markers.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the payload cannot be serialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubwire::frame::{CallbackId, OutboundFrame};
    /// use serde_json::json;
    ///
    /// let frame = OutboundFrame::subscribe(&json!({"version": {"$gt": 0.1}}), CallbackId::new(42))
    ///     .expect("filter is valid JSON");
    /// assert_eq!(
    ///     &frame.to_payload().expect("serialize")[..],
    ///     br#"{"name":"subscribe","query":{"version":{"$gt":0.1}},"id":42}"#
    /// );
    /// ```
    pub fn to_payload(&self) -> Result<Bytes, serde_json::Error> {
        let json = match self {
            Self::Sub { channel } => serde_json::to_vec(&SubPayload { sub: channel }),
            Self::Subscribe { query, id } => {
                serde_json::to_vec(&RequestPayload::Subscribe { query, id: *id })
            }
            Self::Unsubscribe { id } => {
                serde_json::to_vec(&RequestPayload::Unsubscribe { id: *id })
            }
            Self::Publish { doc } => serde_json::to_vec(&RequestPayload::Publish { doc }),
        }?;
        Ok(Bytes::from(json))
    }
}
