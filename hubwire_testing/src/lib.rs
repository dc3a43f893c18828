//! Utilities for testing `hubwire` clients against a scripted hub.
//!
//! [`MockHub`] listens on an ephemeral localhost port and hands out
//! [`HubConnection`]s that read and write marker-delimited frames, so tests
//! can assert on exactly what a client sends and script what it receives.
//!
//! ```rust,no_run
//! use hubwire::HubClient;
//! use hubwire_testing::MockHub;
//!
//! # async fn example() -> std::io::Result<()> {
//! let hub = MockHub::bind().await?;
//! let (client, _events) = HubClient::builder().build();
//! let _ = client.connect("127.0.0.1", hub.addr().port(), "room1");
//! let mut conn = hub.accept().await?;
//! assert_eq!(conn.read_frame().await?, r#"{"sub":"room1"}"#);
//! # Ok(())
//! # }
//! ```

pub mod frames;
pub mod hub;
pub mod logging;

pub use frames::{chunk, frame, split_frames};
pub use hub::{HubConnection, MockHub};
pub use logging::{LoggerHandle, logger};
