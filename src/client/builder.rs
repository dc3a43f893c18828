//! Builder for [`HubClient`].

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use super::{HubClient, Inner, Shared};
use crate::{
    config::{ClientConfig, SocketOptions},
    event::HubEvents,
    router::Router,
};

/// Builder for [`HubClient`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hubwire::{client::HubClient, config::SocketOptions};
///
/// let (client, _events) = HubClient::builder()
///     .connect_timeout(Duration::from_secs(3))
///     .socket_options(SocketOptions::default().nodelay(true))
///     .build();
/// assert!(!client.is_connected());
/// ```
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct HubClientBuilder {
    config: ClientConfig,
}

impl HubClientBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self { Self::default() }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the socket options applied before connecting.
    pub fn socket_options(mut self, options: SocketOptions) -> Self {
        self.config = self.config.with_socket_options(options);
        self
    }

    /// Set the largest message accepted in either direction.
    pub fn max_message_length(mut self, value: usize) -> Self {
        self.config = self.config.with_max_message_length(value);
        self
    }

    /// Set the capacity reserved for each socket read.
    pub fn read_buffer_capacity(mut self, value: usize) -> Self {
        self.config = self.config.with_read_buffer_capacity(value);
        self
    }

    /// Bound each connect attempt.
    pub fn connect_timeout(mut self, value: Duration) -> Self {
        self.config = self.config.with_connect_timeout(value);
        self
    }

    /// Create the client and the receiver for its events.
    pub fn build(self) -> (HubClient, HubEvents) {
        let (tx, events) = HubEvents::channel();
        let client = HubClient {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                router: Router::new(tx),
                config: self.config,
            }),
        };
        (client, events)
    }
}
