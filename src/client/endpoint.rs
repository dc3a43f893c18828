//! Connection targets.

use std::fmt;

/// Host of the public hub used by [`Endpoint::default`].
pub const DEFAULT_HUB_HOST: &str = "hub.pubsub.io";
/// Port of the public hub used by [`Endpoint::default`].
pub const DEFAULT_HUB_PORT: u16 = 10547;
/// Root channel used by [`Endpoint::default`].
pub const DEFAULT_CHANNEL: &str = "/";

/// Where a client connects and which channel it selects once connected.
///
/// The last endpoint passed to [`HubClient::connect_to`](super::HubClient::connect_to)
/// is retained so [`HubClient::reconnect`](super::HubClient::reconnect) can
/// reuse it.
///
/// # Examples
///
/// ```
/// use hubwire::client::Endpoint;
///
/// let endpoint = Endpoint::new("127.0.0.1", 9999, "room1");
/// assert_eq!(endpoint.to_string(), "127.0.0.1:9999 (channel room1)");
/// assert_eq!(Endpoint::default().port(), 10547);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
    channel: String,
}

impl Endpoint {
    /// Create an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, channel: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            channel: channel.into(),
        }
    }

    /// The default hub with the given channel.
    #[must_use]
    pub fn default_hub(channel: impl Into<String>) -> Self {
        Self::new(DEFAULT_HUB_HOST, DEFAULT_HUB_PORT, channel)
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str { &self.host }

    /// TCP port.
    #[must_use]
    pub fn port(&self) -> u16 { self.port }

    /// Channel selected after connecting.
    #[must_use]
    pub fn channel(&self) -> &str { &self.channel }
}

impl Default for Endpoint {
    fn default() -> Self { Self::default_hub(DEFAULT_CHANNEL) }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (channel {})", self.host, self.port, self.channel)
    }
}
