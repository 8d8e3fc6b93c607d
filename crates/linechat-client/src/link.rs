//! Half-duplex request/reply sequencing over one connection.
//!
//! The server speaks strictly request then reply on a single socket, and may
//! also push unsolicited lines. Only one reader may consume the stream at a
//! time, so [`Link`] arbitrates between request exchanges and the background
//! listener.
//!
//! # Invariants
//!
//! - At most one exchange is in flight: the reply read by an exchange belongs
//!   to the request it sent.
//! - An exchange always wins over the listener. A waiting exchange preempts a
//!   listener blocked in a read, and the listener cannot take the stream back
//!   until the exchange has finished.
//! - Preempting a read never loses data (the transport read is cancel-safe).
//! - An exchange that times out closes the connection. Its reply may still
//!   arrive and would otherwise be read as the reply to the next request.
//!
//! A line the server pushes unprompted while an exchange is waiting for its
//! reply is indistinguishable from that reply. The protocol has no request
//! identifiers, so this cannot be resolved here.

use std::time::Duration;

use linechat_proto::ResponseFraming;
use tokio::{
    sync::{Mutex, Notify},
    time::timeout,
};

use crate::{ClientError, ConnectionConfig, LineTransport};

/// Shared handle to one connection.
pub struct Link<T> {
    transport: T,
    /// Held by an exchange for its whole duration, and by the listener only
    /// while it acquires `turn`.
    gate: Mutex<()>,
    /// Ownership of the read side.
    turn: Mutex<()>,
    /// Asks the listener to give up `turn`.
    preempt: Notify,
    read_timeout: Option<Duration>,
    burst_grace: Duration,
}

impl<T: LineTransport> Link<T> {
    /// Wrap an open transport.
    pub fn new(transport: T, config: &ConnectionConfig) -> Self {
        Self {
            transport,
            gate: Mutex::new(()),
            turn: Mutex::new(()),
            preempt: Notify::new(),
            read_timeout: config.read_timeout,
            burst_grace: config.burst_grace,
        }
    }

    /// Send one request line and read its reply.
    ///
    /// With [`ResponseFraming::Burst`] the reply is the first line plus every
    /// line that follows within the burst grace period, joined with `\n`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ConnectionClosed`] if the peer closes before replying
    /// - [`ClientError::Timeout`] if the read timeout elapses first. The
    ///   connection is closed, so later exchanges fail with
    ///   [`ClientError::ConnectionClosed`].
    /// - I/O errors from the transport
    pub async fn exchange(&self, line: &str, framing: ResponseFraming) -> Result<String, ClientError> {
        let _gate = self.gate.lock().await;
        self.preempt.notify_one();
        let _turn = self.turn.lock().await;

        self.transport.send_line(line).await?;
        let first = self.read_reply().await?;

        match framing {
            ResponseFraming::SingleLine => Ok(first),
            ResponseFraming::Burst => {
                let mut lines = vec![first];
                while let Ok(next) = timeout(self.burst_grace, self.transport.receive_line()).await {
                    match next? {
                        Some(line) => lines.push(line),
                        None => break,
                    }
                }
                tracing::trace!(lines = lines.len(), "burst reply");
                Ok(lines.join("\n"))
            },
        }
    }

    /// Wait for a line outside any exchange.
    ///
    /// Yields to every exchange and resumes reading once it finishes. Returns
    /// `Ok(None)` at end of stream or when the link is closed.
    pub async fn next_unsolicited(&self) -> Result<Option<String>, ClientError> {
        loop {
            let gate = self.gate.lock().await;
            let turn = self.turn.lock().await;
            drop(gate);

            tokio::select! {
                biased;
                () = self.preempt.notified() => {
                    drop(turn);
                },
                line = self.transport.receive_line() => return line,
            }
        }
    }

    /// Close the underlying transport, releasing any blocked reader.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    /// Whether the underlying transport is still open.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn read_reply(&self) -> Result<String, ClientError> {
        let received = match self.read_timeout {
            Some(limit) => match timeout(limit, self.transport.receive_line()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(timeout = ?limit, "no reply in time, closing connection");
                    self.transport.close().await;
                    return Err(ClientError::Timeout(limit));
                },
            },
            None => self.transport.receive_line().await,
        };
        received?.ok_or(ClientError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex};

    use super::*;
    use crate::LineConnection;

    fn link_with(config: &ConnectionConfig) -> (Arc<Link<LineConnection<DuplexStream>>>, DuplexStream) {
        let (local, remote) = duplex(4096);
        let conn = LineConnection::from_stream("test", local, config.max_line_length);
        (Arc::new(Link::new(conn, config)), remote)
    }

    /// Reads one request line, then writes `replies` verbatim.
    fn reply_once(remote: DuplexStream, replies: &'static [u8]) -> tokio::task::JoinHandle<String> {
        tokio::spawn(async move {
            let (read_half, mut write_half) = tokio::io::split(remote);
            let mut lines = BufReader::new(read_half).lines();
            let request = lines.next_line().await.unwrap().unwrap();
            write_half.write_all(replies).await.unwrap();
            request
        })
    }

    #[tokio::test]
    async fn exchange_returns_first_line() {
        let (link, remote) = link_with(&ConnectionConfig::default());
        let server = reply_once(remote, b"ab12cd34\n");

        let reply = link.exchange("localhost 5000 1 alice", ResponseFraming::SingleLine).await;
        assert_eq!(reply.unwrap(), "ab12cd34");
        assert_eq!(server.await.unwrap(), "localhost 5000 1 alice");
    }

    #[tokio::test]
    async fn burst_collects_follow_up_lines() {
        let (link, remote) = link_with(&ConnectionConfig::default());
        let server = reply_once(remote, b"alice\nbob\ncarol\n");

        let reply = link.exchange("alice 4", ResponseFraming::Burst).await.unwrap();
        assert_eq!(reply, "alice\nbob\ncarol");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn peer_close_before_reply_is_connection_closed() {
        let (link, remote) = link_with(&ConnectionConfig::default());
        let server = reply_once(remote, b"");

        let reply = link.exchange("alice 4", ResponseFraming::SingleLine).await;
        server.await.unwrap();
        assert_eq!(reply, Err(ClientError::ConnectionClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let config = ConnectionConfig { read_timeout: Some(Duration::from_secs(1)), ..ConnectionConfig::default() };
        let (link, _remote) = link_with(&config);

        let reply = link.exchange("alice 4", ResponseFraming::SingleLine).await;
        assert_eq!(reply, Err(ClientError::Timeout(Duration::from_secs(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_never_answers_next_request() {
        let config = ConnectionConfig { read_timeout: Some(Duration::from_secs(1)), ..ConnectionConfig::default() };
        let (link, remote) = link_with(&config);
        let server = tokio::spawn(async move {
            let (read_half, mut write_half) = tokio::io::split(remote);
            let mut lines = BufReader::new(read_half).lines();
            let _ = lines.next_line().await;
            tokio::time::sleep(Duration::from_secs(2)).await;
            // The client may already be gone.
            let _ = write_half.write_all(b"reply-to-first\n").await;
        });

        let first = link.exchange("alice 4", ResponseFraming::SingleLine).await;
        assert_eq!(first, Err(ClientError::Timeout(Duration::from_secs(1))));
        assert!(!link.is_open());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let second = link.exchange("alice 5", ResponseFraming::SingleLine).await;
        assert_eq!(second, Err(ClientError::ConnectionClosed));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn exchange_preempts_blocked_listener() {
        let (link, remote) = link_with(&ConnectionConfig::default());

        let listener = {
            let link = Arc::clone(&link);
            tokio::spawn(async move { link.next_unsolicited().await })
        };
        tokio::task::yield_now().await;

        let server = reply_once(remote, b"OK\nalice|bob|ping\n");
        let reply = link.exchange("localhost 5000 3 tok alice ping", ResponseFraming::SingleLine).await;

        assert_eq!(reply.unwrap(), "OK");
        server.await.unwrap();
        assert_eq!(listener.await.unwrap().unwrap().as_deref(), Some("alice|bob|ping"));
    }

    #[tokio::test]
    async fn close_ends_listener() {
        let (link, _remote) = link_with(&ConnectionConfig::default());

        let listener = {
            let link = Arc::clone(&link);
            tokio::spawn(async move { link.next_unsolicited().await })
        };
        tokio::task::yield_now().await;
        link.close().await;

        let result = listener.await.unwrap();
        assert!(matches!(result, Ok(None) | Err(ClientError::ConnectionClosed)));
        assert!(!link.is_open());
    }
}
