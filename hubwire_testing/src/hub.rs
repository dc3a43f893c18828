//! A scripted stand-in for the hub.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use hubwire::codec::{FRAME_END, FRAME_START};
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

use crate::frames::frame;

/// How long each [`MockHub`] step waits before failing.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

fn timed_out(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{what} did not complete within {STEP_TIMEOUT:?}"),
    )
}

/// Listener accepting client connections on an ephemeral localhost port.
#[derive(Debug)]
pub struct MockHub {
    listener: TcpListener,
}

impl MockHub {
    /// Bind to a free localhost port.
    ///
    /// # Errors
    ///
    /// Returns any IO error encountered while binding.
    pub async fn bind() -> io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0)).await?;
        Ok(Self { listener })
    }

    /// Address clients should connect to.
    ///
    /// # Panics
    ///
    /// Panics if the socket has no local address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.listener
            .local_addr()
            .expect("bound listener has a local address")
    }

    /// Wait for the next client.
    ///
    /// # Errors
    ///
    /// Returns an error if no client connects within [`STEP_TIMEOUT`].
    pub async fn accept(&self) -> io::Result<HubConnection> {
        let (stream, peer) = timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| timed_out("accept"))??;
        Ok(HubConnection { stream, peer })
    }
}

/// One accepted client connection.
#[derive(Debug)]
pub struct HubConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl HubConnection {
    /// The client's address.
    #[must_use]
    pub fn peer(&self) -> SocketAddr { self.peer }

    /// Read one frame and return its payload as text.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, on EOF, if the frame does not begin with
    /// the start marker, or if the payload is not UTF-8.
    pub async fn read_frame(&mut self) -> io::Result<String> {
        let mut payload = Vec::new();
        let first = self.read_byte().await?;
        if first != FRAME_START {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected start marker, got {first:#04x}"),
            ));
        }
        loop {
            match self.read_byte().await? {
                FRAME_END => break,
                byte => payload.push(byte),
            }
        }
        String::from_utf8(payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Read one frame and parse its payload as JSON.
    ///
    /// # Errors
    ///
    /// As for [`read_frame`](Self::read_frame), plus invalid JSON.
    pub async fn read_json(&mut self) -> io::Result<Value> {
        let text = self.read_frame().await?;
        serde_json::from_str(&text).map_err(io::Error::from)
    }

    /// Send `payload` wrapped in markers.
    ///
    /// # Errors
    ///
    /// Returns any IO error from the socket.
    pub async fn send_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        self.send_raw(&frame(payload)).await
    }

    /// Send a document to the client under callback `id`.
    ///
    /// # Errors
    ///
    /// Returns any IO error from the socket.
    pub async fn deliver(&mut self, id: i64, doc: &Value) -> io::Result<()> {
        let envelope = serde_json::json!({ "id": id, "doc": doc });
        self.send_frame(envelope.to_string().as_bytes()).await
    }

    /// Send bytes exactly as given.
    ///
    /// # Errors
    ///
    /// Returns any IO error from the socket.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Wait until the client closes its side, returning any unread bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the client keeps the socket open past
    /// [`STEP_TIMEOUT`].
    pub async fn expect_closed(&mut self) -> io::Result<Vec<u8>> {
        let mut rest = Vec::new();
        timeout(STEP_TIMEOUT, self.stream.read_to_end(&mut rest))
            .await
            .map_err(|_| timed_out("close"))??;
        Ok(rest)
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        timeout(STEP_TIMEOUT, self.stream.read_u8())
            .await
            .map_err(|_| timed_out("frame read"))?
    }
}
