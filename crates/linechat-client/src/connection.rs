//! Line transport over a byte stream.
//!
//! [`LineConnection`] owns one stream, split into a framed reader and writer.
//! This is a thin layer that only moves lines; request/reply sequencing lives
//! in [`crate::Link`] and protocol meaning in [`crate::Session`].

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    net::TcpStream,
    sync::Mutex,
    time::timeout,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite, LinesCodec},
    sync::CancellationToken,
};

use crate::{ClientError, ConnectionConfig};

/// Line-oriented transport over one connection.
///
/// # Invariants
///
/// - No line is sent or received after [`LineTransport::close`]; both return
///   [`ClientError::ConnectionClosed`].
/// - `receive_line` is cancel-safe: dropping its future loses no buffered
///   data. [`crate::Link`] relies on this to preempt the listener and to apply
///   read timeouts.
pub trait LineTransport: Send + Sync + 'static {
    /// Write `line` followed by `\n` and flush.
    fn send_line(&self, line: &str) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Wait for the next complete line, terminator stripped.
    ///
    /// Returns `Ok(None)` when the peer closed the stream gracefully or the
    /// connection was closed locally while waiting.
    fn receive_line(&self) -> impl Future<Output = Result<Option<String>, ClientError>> + Send;

    /// Release the connection. Idempotent; failures are logged, not returned.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Whether [`LineTransport::close`] has not been called yet.
    fn is_open(&self) -> bool;
}

/// Opens transports to a server.
pub trait Connector: Send + Sync + 'static {
    /// Transport produced by this connector.
    type Transport: LineTransport;

    /// Establish a connection to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the connection cannot be
    /// established.
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Transport, ClientError>> + Send;
}

/// [`LineTransport`] over any async byte stream.
pub struct LineConnection<S> {
    peer: String,
    reader: Mutex<Option<FramedRead<ReadHalf<S>, LinesCodec>>>,
    writer: Mutex<Option<FramedWrite<WriteHalf<S>, LinesCodec>>>,
    closed: CancellationToken,
}

impl<S> LineConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap an established stream.
    ///
    /// `peer` is only used for logging.
    pub fn from_stream(peer: impl Into<String>, stream: S, max_line_length: usize) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader = FramedRead::new(read_half, LinesCodec::new_with_max_length(max_line_length));
        let writer = FramedWrite::new(write_half, LinesCodec::new());

        Self {
            peer: peer.into(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: CancellationToken::new(),
        }
    }

    /// Peer address (host:port).
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl LineConnection<TcpStream> {
    /// Connect to `host:port` over TCP.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] on refusal, resolution failure or
    /// when `config.connect_timeout` elapses.
    pub async fn open(host: &str, port: u16, config: &ConnectionConfig) -> Result<Self, ClientError> {
        let addr = format!("{host}:{port}");
        let connect = TcpStream::connect((host, port));

        let result = match config.connect_timeout {
            Some(limit) => timeout(limit, connect).await.map_err(|_| ClientError::Connect {
                addr: addr.clone(),
                reason: format!("timed out after {limit:?}"),
            })?,
            None => connect.await,
        };
        let stream = result
            .map_err(|e| ClientError::Connect { addr: addr.clone(), reason: e.to_string() })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(peer = %addr, error = %e, "failed to disable Nagle");
        }

        tracing::info!(peer = %addr, "connected");
        Ok(Self::from_stream(addr, stream, config.max_line_length))
    }
}

impl<S> LineTransport for LineConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send_line(&self, line: &str) -> Result<(), ClientError> {
        if self.closed.is_cancelled() {
            return Err(ClientError::ConnectionClosed);
        }

        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(ClientError::ConnectionClosed)?;
        tracing::trace!(peer = %self.peer, line, "send");

        // One framed write per line: the codec appends the terminator and
        // `send` flushes before returning.
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(ClientError::ConnectionClosed),
            result = sink.send(line) => result.map_err(ClientError::from),
        }
    }

    async fn receive_line(&self) -> Result<Option<String>, ClientError> {
        if self.closed.is_cancelled() {
            return Err(ClientError::ConnectionClosed);
        }

        let mut reader = self.reader.lock().await;
        let stream = reader.as_mut().ok_or(ClientError::ConnectionClosed)?;

        tokio::select! {
            biased;
            () = self.closed.cancelled() => Ok(None),
            next = stream.next() => match next {
                Some(Ok(line)) => {
                    tracing::trace!(peer = %self.peer, line = %line, "recv");
                    Ok(Some(line))
                },
                Some(Err(e)) => Err(e.into()),
                None => {
                    tracing::debug!(peer = %self.peer, "peer closed stream");
                    Ok(None)
                },
            },
        }
    }

    async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        // Wakes any blocked receive or send so the locks below are released.
        self.closed.cancel();

        // Output half: flush and shut down the write direction.
        if let Some(mut sink) = self.writer.lock().await.take()
            && let Err(e) = SinkExt::<&str>::close(&mut sink).await
        {
            tracing::warn!(peer = %self.peer, error = %e, "failed to shut down output stream");
        }

        // Input half: dropping it releases the last reference to the socket.
        if self.reader.lock().await.take().is_none() {
            tracing::warn!(peer = %self.peer, "input stream already released");
        }

        tracing::debug!(peer = %self.peer, "connection closed");
    }

    fn is_open(&self) -> bool {
        !self.closed.is_cancelled()
    }
}

/// Production connector over TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: ConnectionConfig,
}

impl TcpConnector {
    /// Connector using `config` for every connection.
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

impl Connector for TcpConnector {
    type Transport = LineConnection<TcpStream>;

    async fn connect(&self, host: &str, port: u16) -> Result<Self::Transport, ClientError> {
        LineConnection::open(host, port, &self.config).await
    }
}
