//! Client configuration.
//!
//! [`ClientConfig`] bundles the tunables of a
//! [`HubClient`](crate::client::HubClient): message size limit, read buffer
//! capacity, connect timeout and the [`SocketOptions`] applied to every new
//! socket.

use std::{io, time::Duration};

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpSocket;

use crate::codec::{DEFAULT_MESSAGE_LENGTH, clamp_message_length};

/// Default capacity reserved for each socket read.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 1024;

/// Default bound on a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every connection a client opens.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hubwire::config::{ClientConfig, SocketOptions};
///
/// let config = ClientConfig::default()
///     .with_connect_timeout(Duration::from_secs(2))
///     .with_socket_options(SocketOptions::default().nodelay(true));
/// assert_eq!(config.connect_timeout(), Duration::from_secs(2));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    max_message_length: usize,
    read_buffer_capacity: usize,
    connect_timeout: Duration,
    socket_options: SocketOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MESSAGE_LENGTH,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            socket_options: SocketOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Set the largest inbound or outbound message accepted.
    ///
    /// The value is clamped to the codec's supported range.
    #[must_use]
    pub fn with_max_message_length(mut self, value: usize) -> Self {
        self.max_message_length = clamp_message_length(value);
        self
    }

    /// Set the capacity reserved for each socket read. Zero is raised to one.
    #[must_use]
    pub fn with_read_buffer_capacity(mut self, value: usize) -> Self {
        self.read_buffer_capacity = value.max(1);
        self
    }

    /// Bound each connect attempt; an attempt that exceeds it fails.
    #[must_use]
    pub fn with_connect_timeout(mut self, value: Duration) -> Self {
        self.connect_timeout = value;
        self
    }

    /// Replace the socket options applied before connecting.
    #[must_use]
    pub fn with_socket_options(mut self, value: SocketOptions) -> Self {
        self.socket_options = value;
        self
    }

    /// Maximum message length in bytes.
    #[must_use]
    pub fn max_message_length(&self) -> usize { self.max_message_length }

    /// Capacity reserved for each socket read.
    #[must_use]
    pub fn read_buffer_capacity(&self) -> usize { self.read_buffer_capacity }

    /// Bound on a single connect attempt.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration { self.connect_timeout }

    /// Socket options applied before connecting.
    #[must_use]
    pub fn socket_options(&self) -> SocketOptions { self.socket_options }
}

/// Socket options applied before connecting.
///
/// Unset options keep the operating system defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketOptions {
    nodelay: Option<bool>,
    keepalive: Option<Option<Duration>>,
    linger: Option<Option<Duration>>,
}

impl SocketOptions {
    /// Configure `TCP_NODELAY`.
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = Some(enabled);
        self
    }

    /// Configure `SO_KEEPALIVE`; `Some(idle)` enables probes after `idle`.
    #[must_use]
    pub fn keepalive(mut self, idle: Option<Duration>) -> Self {
        self.keepalive = Some(idle);
        self
    }

    /// Configure `SO_LINGER`; `None` disables lingering on close.
    #[must_use]
    pub fn linger(mut self, duration: Option<Duration>) -> Self {
        self.linger = Some(duration);
        self
    }

    pub(crate) fn apply(&self, socket: &TcpSocket) -> io::Result<()> {
        if let Some(enabled) = self.nodelay {
            socket.set_nodelay(enabled)?;
        }
        if let Some(keepalive) = self.keepalive {
            socket.set_keepalive(keepalive.is_some())?;
            if let Some(idle) = keepalive {
                SockRef::from(socket).set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
            }
        }
        if let Some(linger) = self.linger {
            socket.set_linger(linger)?;
        }
        Ok(())
    }
}
