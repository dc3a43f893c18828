//! Command line interface for the `hubwire` binary.
//!
//! Shared with the build script, which renders the man page from it, so it
//! depends on nothing but `clap` and `std`.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

/// Command line arguments for the `hubwire` binary.
#[derive(Debug, Parser)]
#[command(name = "hubwire", version, about = "Talk to a JSON pub/sub hub")]
pub struct Cli {
    /// Hub host name or address.
    #[arg(long, default_value = "hub.pubsub.io")]
    pub host: String,
    /// Hub TCP port.
    #[arg(short, long, default_value_t = 10547)]
    pub port: u16,
    /// Channel selected after connecting.
    #[arg(short, long, default_value = "/")]
    pub channel: String,
    /// Seconds to wait for the TCP connection.
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,
    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
    #[command(subcommand)]
    pub command: Command,
}

/// What to do once connected.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Subscribe with a JSON filter and print matching documents.
    Subscribe {
        /// Filter document, as JSON.
        #[arg(short, long, default_value = "{}")]
        filter: String,
        /// Callback id tagging matching documents.
        #[arg(long, default_value_t = 1)]
        id: i64,
    },
    /// Publish one JSON document and exit.
    Publish {
        /// Document to publish, as JSON.
        doc: String,
    },
    /// Print every raw message received on the channel.
    Listen,
}
