//! Stream worker owning one live socket.
//!
//! A [`StreamWorker`] splits its stream into a read half, driven by a
//! background task, and a write half behind an async mutex. The read loop
//! reports raw bytes, feeds the [`HubCodec`] and hands every complete message
//! to the [`Router`]. It ends on end-of-stream, on an I/O error, or when the
//! worker is stopped. In every case it closes the socket and emits exactly one
//! event chosen by the exit hook.

use std::{fmt, io, ops::DerefMut, pin::Pin, sync::Arc};

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf},
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
};
use tokio_util::{
    codec::{Decoder, Encoder},
    sync::CancellationToken,
};
use tracing::Instrument;

use crate::{
    client::ClientError,
    codec::{CodecError, HubCodec},
    config::ClientConfig,
    event::Event,
    metrics::{self, Direction},
    router::Router,
};

type BoxWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Why a read loop ended.
#[derive(Debug)]
pub(crate) enum Termination {
    /// The worker was stopped locally.
    Stopped,
    /// The peer closed the stream.
    Eof,
    /// Reading failed.
    Failed(io::Error),
}

impl Termination {
    pub(crate) fn event(&self) -> Event {
        match self {
            Self::Stopped => Event::Terminated,
            Self::Eof | Self::Failed(_) => Event::ConnectionLost,
        }
    }
}

/// Callback run once when the read loop has finished and the socket is closed.
///
/// Returns the event announcing the end of the connection, normally
/// [`Termination::event`].
pub(crate) type ExitHook = Box<dyn FnOnce(&Termination) -> Event + Send>;

struct WriterState {
    sink: Option<BoxWriter>,
    codec: HubCodec,
    buf: BytesMut,
}

/// Serialized write access to a worker's socket.
///
/// Clones share the same socket; concurrent writers queue on the mutex so
/// frames are never interleaved on the wire.
#[derive(Clone)]
pub(crate) struct FrameWriter {
    state: Arc<Mutex<WriterState>>,
    cancel: CancellationToken,
    router: Router,
}

impl fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWriter")
            .field("closed", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Exclusive write access held across several frames.
pub(crate) struct WriteGuard {
    state: OwnedMutexGuard<WriterState>,
    cancel: CancellationToken,
    router: Router,
}

impl FrameWriter {
    /// Frame `payload` and write it to the socket.
    pub(crate) async fn write(&self, payload: Bytes) -> Result<(), ClientError> {
        self.lock().await.write(payload).await
    }

    /// Acquire the write lock.
    pub(crate) async fn lock(&self) -> WriteGuard {
        WriteGuard {
            state: Arc::clone(&self.state).lock_owned().await,
            cancel: self.cancel.clone(),
            router: self.router.clone(),
        }
    }

    /// Shut the write half down. Failures are logged, not returned.
    async fn close(&self) {
        let mut state = self.state.lock().await;
        let Some(mut sink) = state.sink.take() else {
            return;
        };
        if let Err(e) = sink.shutdown().await {
            tracing::warn!(error = %e, "failed to shut down socket write half");
        }
    }
}

impl WriteGuard {
    /// Frame `payload` and write it while holding the lock.
    pub(crate) async fn write(&mut self, payload: Bytes) -> Result<(), ClientError> {
        let WriterState { sink, codec, buf } = self.state.deref_mut();
        let Some(sink) = sink.as_mut() else {
            return Err(ClientError::Disconnected);
        };
        if self.cancel.is_cancelled() {
            return Err(ClientError::Disconnected);
        }
        buf.clear();
        if let Err(e) = codec.encode(payload.clone(), buf) {
            metrics::inc_errors(e.error_type());
            return Err(e.into());
        }

        let written = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ClientError::Disconnected),
            res = write_frame(sink, buf) => res,
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "frame write failed");
            metrics::inc_errors("io");
            return Err(e.into());
        }

        tracing::debug!(frame.bytes = buf.len(), "frame written");
        metrics::inc_frames(Direction::Outbound);
        self.router.emit(Event::Sent(payload));
        Ok(())
    }
}

async fn write_frame(sink: &mut BoxWriter, frame: &[u8]) -> io::Result<()> {
    sink.write_all(frame).await?;
    sink.flush().await
}

/// Handle to the task driving one live socket.
pub(crate) struct StreamWorker {
    writer: FrameWriter,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl fmt::Debug for StreamWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWorker")
            .field("finished", &self.handle.is_finished())
            .finish_non_exhaustive()
    }
}

impl StreamWorker {
    /// Take ownership of `stream` and start its read loop.
    ///
    /// Must be called within a Tokio runtime.
    pub(crate) fn spawn<S>(
        stream: S,
        config: &ClientConfig,
        router: Router,
        on_exit: ExitHook,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, write_half) = tokio::io::split(stream);
        let cancel = CancellationToken::new();
        let writer = FrameWriter {
            state: Arc::new(Mutex::new(WriterState {
                sink: Some(Box::pin(write_half)),
                codec: HubCodec::new(config.max_message_length()),
                buf: BytesMut::new(),
            })),
            cancel: cancel.clone(),
            router: router.clone(),
        };

        let read_loop = ReadLoop {
            reader,
            codec: HubCodec::new(config.max_message_length()),
            capacity: config.read_buffer_capacity(),
            router: router.clone(),
            cancel: cancel.clone(),
        };
        let exit_writer = writer.clone();
        let exit_cancel = cancel.clone();
        metrics::inc_connections();
        let handle = tokio::spawn(
            async move {
                let termination = read_loop.run().await;
                match &termination {
                    Termination::Stopped => tracing::info!("connection stopped"),
                    Termination::Eof => tracing::info!("hub closed the connection"),
                    Termination::Failed(e) => tracing::warn!(error = %e, "connection failed"),
                }
                exit_cancel.cancel();
                exit_writer.close().await;
                metrics::dec_connections();
                router.emit(on_exit(&termination));
            }
            .instrument(tracing::info_span!("hub.read_loop")),
        );

        Self {
            writer,
            cancel,
            handle,
        }
    }

    /// Shared write access to this worker's socket.
    pub(crate) fn writer(&self) -> FrameWriter { self.writer.clone() }

    /// Force the socket closed and wait for the read loop to finish.
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!(error = %e, "read loop task did not finish cleanly");
        }
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) { self.cancel.cancel(); }
}

struct ReadLoop<S> {
    reader: ReadHalf<S>,
    codec: HubCodec,
    capacity: usize,
    router: Router,
    cancel: CancellationToken,
}

impl<S: AsyncRead> ReadLoop<S> {
    async fn run(mut self) -> Termination {
        let mut buf = BytesMut::with_capacity(self.capacity);
        loop {
            buf.reserve(self.capacity);
            let start = buf.len();
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Termination::Stopped,
                res = self.reader.read_buf(&mut buf) => res,
            };
            match read {
                Ok(0) => {
                    self.drain_eof(&mut buf);
                    return Termination::Eof;
                }
                Ok(n) => {
                    tracing::debug!(bytes = n, "received");
                    self.router
                        .emit(Event::Raw(Bytes::copy_from_slice(&buf[start..])));
                    if let Err(e) = self.drain(&mut buf) {
                        return Termination::Failed(e.into());
                    }
                }
                Err(e) => return Termination::Failed(e),
            }
        }
    }

    /// Dispatch every complete message in `buf`.
    fn drain(&mut self, buf: &mut BytesMut) -> Result<(), CodecError> {
        loop {
            match self.codec.decode(buf) {
                Ok(Some(message)) => self.deliver(&message),
                Ok(None) => return Ok(()),
                Err(e) => self.recover(e)?,
            }
        }
    }

    fn drain_eof(&mut self, buf: &mut BytesMut) {
        loop {
            match self.codec.decode_eof(buf) {
                Ok(Some(message)) => self.deliver(&message),
                Ok(None) => return,
                Err(e) => {
                    let policy = e.default_recovery_policy().as_str();
                    tracing::warn!(error = %e, policy, "stream ended mid-message");
                    metrics::inc_errors(e.error_type());
                    self.router.emit(Event::ProtocolError(e));
                    return;
                }
            }
        }
    }

    fn deliver(&self, message: &[u8]) {
        metrics::inc_frames(Direction::Inbound);
        self.router.dispatch(message);
    }

    fn recover(&self, err: CodecError) -> Result<(), CodecError> {
        metrics::inc_errors(err.error_type());
        let policy = err.default_recovery_policy().as_str();
        if err.should_disconnect() {
            tracing::warn!(error = %err, policy, "closing after codec error");
            return Err(err);
        }
        tracing::warn!(error = %err, policy, "dropping undecodable message");
        self.router.emit(Event::ProtocolError(err));
        Ok(())
    }
}

#[cfg(test)]
mod tests;
