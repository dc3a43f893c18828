#![doc(html_root_url = "https://docs.rs/hubwire/latest")]
//! Public API for the `hubwire` library.
//!
//! This crate is a client for a JSON pub/sub hub speaking a marker-framed
//! stream protocol. It connects to a hub, selects a channel, subscribes with
//! filter documents, publishes documents, and delivers matching documents
//! tagged with caller-chosen callback ids.
//!
//! The entry point is [`HubClient`]; everything it observes arrives on the
//! [`HubEvents`] channel returned alongside it.

pub mod client;
pub mod codec;
pub mod config;
pub mod event;
pub mod frame;
pub mod metrics;
pub mod router;
mod worker;

pub use client::{ClientError, ConnectAttempt, Endpoint, HubClient, HubClientBuilder};
pub use codec::{CodecError, HubCodec};
pub use event::{ConnectionState, Event, HubEvents};
pub use frame::{CallbackId, OutboundFrame};
pub use router::{Envelope, SinkReceiver};
