//! Connect attempts and worker installation.

use std::{
    io,
    net::SocketAddr,
    sync::{Arc, Weak},
};

use tokio::net::{TcpSocket, TcpStream, lookup_host};

use super::{Endpoint, Shared};
use crate::{
    config::SocketOptions,
    event::{ConnectionState, Event},
    frame::OutboundFrame,
    worker::{ExitHook, FrameWriter, StreamWorker, Termination},
};

/// Resolve `endpoint` and connect to the first address that accepts.
pub(crate) async fn open_socket(
    endpoint: &Endpoint,
    options: SocketOptions,
) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in lookup_host((endpoint.host(), endpoint.port())).await? {
        match connect_addr(addr, options).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(peer.addr = %addr, error = %e, "address refused connection");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} did not resolve to any address", endpoint.host()),
        )
    }))
}

async fn connect_addr(addr: SocketAddr, options: SocketOptions) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    options.apply(&socket)?;
    socket.connect(addr).await
}

impl Shared {
    /// Drive one connect attempt started by `HubClient::connect_to`.
    pub(super) async fn run_attempt(self: Arc<Self>, endpoint: Endpoint, generation: u64) {
        tracing::info!("connecting");
        let opened = tokio::time::timeout(
            self.config.connect_timeout(),
            open_socket(&endpoint, self.config.socket_options()),
        )
        .await;
        let stream = match opened {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return self.attempt_failed(generation, e.to_string()),
            Err(_) => {
                let reason = format!("timed out after {:?}", self.config.connect_timeout());
                return self.attempt_failed(generation, reason);
            }
        };
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => return self.attempt_failed(generation, e.to_string()),
        };

        let Some(writer) = self.install_worker(stream, generation) else {
            tracing::debug!("connection superseded before it was installed");
            return;
        };
        // Held until the channel selection is written so it is the first frame.
        let mut guard = writer.lock().await;
        {
            let mut inner = self.lock();
            if inner.generation != generation || inner.worker.is_none() {
                tracing::debug!("connection ended before it was established");
                return;
            }
            self.set_state(&mut inner, ConnectionState::Connected);
            tracing::info!(peer.addr = %peer, "connected");
            self.router.emit(Event::Connected {
                host: endpoint.host().to_owned(),
                peer,
            });
            self.router.emit(Event::Subscribable);
        }

        let sub = OutboundFrame::Sub {
            channel: endpoint.channel().to_owned(),
        };
        let result = match sub.to_payload() {
            Ok(payload) => guard.write(payload).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, channel = endpoint.channel(), "failed to select channel");
        }
    }

    fn attempt_failed(&self, generation: u64, reason: String) {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != ConnectionState::Connecting {
            return;
        }
        tracing::warn!(reason = %reason, "connection failed");
        inner.attempt = None;
        self.router.emit(Event::ConnectionFailed { reason });
        self.set_state(&mut inner, ConnectionState::Disconnected);
    }

    /// Hand `stream` to a new worker if the attempt is still current.
    fn install_worker(
        self: &Arc<Self>,
        stream: TcpStream,
        generation: u64,
    ) -> Option<FrameWriter> {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != ConnectionState::Connecting {
            return None;
        }
        inner.attempt = None;
        let worker = StreamWorker::spawn(
            stream,
            &self.config,
            self.router.clone(),
            exit_hook(Arc::downgrade(self), generation),
        );
        let writer = worker.writer();
        inner.worker = Some(worker);
        Some(writer)
    }
}

/// Transition to `Disconnected` when the worker for `generation` ends.
///
/// A worker that ends before its connection was announced reports the
/// attempt as failed rather than lost.
pub(super) fn exit_hook(shared: Weak<Shared>, generation: u64) -> ExitHook {
    Box::new(move |termination: &Termination| {
        let Some(shared) = shared.upgrade() else {
            return termination.event();
        };
        let mut inner = shared.lock();
        if inner.generation != generation {
            return termination.event();
        }
        tracing::debug!(?termination, "worker exited");
        // The worker is running this hook from inside its own task.
        drop(inner.worker.take());
        let event = if inner.state == ConnectionState::Connecting {
            let reason = match termination {
                Termination::Failed(e) => e.to_string(),
                Termination::Eof | Termination::Stopped => {
                    "connection closed before it was established".to_owned()
                }
            };
            tracing::warn!(reason = %reason, "connection failed");
            Event::ConnectionFailed { reason }
        } else {
            termination.event()
        };
        shared.set_state(&mut inner, ConnectionState::Disconnected);
        event
    })
}
