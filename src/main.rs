//! Command line client for a JSON pub/sub hub.
//!
//! Connects, selects a channel, then subscribes, publishes or listens
//! depending on the subcommand.

mod cli;

use std::{error::Error, time::Duration};

use clap::Parser;
use cli::{Cli, Command};
use hubwire::{CallbackId, Event, HubClient, HubEvents};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let action = Action::from_command(&cli.command)?;
    install_metrics(&cli)?;

    let (client, events) = HubClient::builder()
        .connect_timeout(Duration::from_secs(cli.connect_timeout))
        .build();
    let _ = client.connect(cli.host.as_str(), cli.port, cli.channel.as_str());
    run(&client, events, &action).await
}

/// A subcommand with its JSON arguments parsed.
#[derive(Debug, PartialEq)]
enum Action {
    Subscribe { filter: Value, id: CallbackId },
    Publish(Value),
    Listen,
}

impl Action {
    fn from_command(command: &Command) -> serde_json::Result<Self> {
        Ok(match command {
            Command::Subscribe { filter, id } => Self::Subscribe {
                filter: serde_json::from_str(filter)?,
                id: CallbackId::new(*id),
            },
            Command::Publish { doc } => Self::Publish(serde_json::from_str(doc)?),
            Command::Listen => Self::Listen,
        })
    }
}

#[cfg(feature = "metrics")]
fn install_metrics(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "serving metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if cli.metrics_addr.is_some() {
        tracing::warn!("built without the metrics feature; ignoring --metrics-addr");
    }
    Ok(())
}

async fn run(
    client: &HubClient,
    mut events: HubEvents,
    action: &Action,
) -> Result<(), Box<dyn Error>> {
    while let Some(event) = events.recv().await {
        match event {
            Event::Subscribable => match action {
                Action::Subscribe { filter, id } => client.subscribe(filter, *id).await?,
                Action::Publish(doc) => {
                    client.publish(doc).await?;
                    client.disconnect().await;
                    return Ok(());
                }
                Action::Listen => {}
            },
            Event::Message { id, doc } => println!("{id}\t{doc}"),
            Event::Raw(bytes) if *action == Action::Listen => {
                println!("{}", String::from_utf8_lossy(&bytes));
            }
            Event::ConnectionFailed { reason } => return Err(reason.into()),
            Event::ConnectionLost => return Err("hub closed the connection".into()),
            Event::Terminated => return Ok(()),
            _ => {}
        }
    }
    Ok(())
}
