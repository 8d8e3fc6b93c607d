//! Scripted in-memory transport.
//!
//! [`MockTransport`] plays the server side of a conversation from a script:
//! every line the client sends releases the next scripted reply. Tests keep a
//! clone of the transport to inspect what went over the wire.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use linechat_client::{ClientError, Connector, LineTransport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Delivery = Result<String, ClientError>;

struct Shared {
    sent: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<Vec<String>>>,
    inbox_tx: mpsc::UnboundedSender<Delivery>,
    inbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Delivery>>,
    closed: CancellationToken,
    hung_up: CancellationToken,
    close_calls: AtomicUsize,
}

/// In-memory [`LineTransport`] driven by a reply script.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Transport with an empty script.
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                sent: Mutex::new(Vec::new()),
                replies: Mutex::new(VecDeque::new()),
                inbox_tx,
                inbox_rx: tokio::sync::Mutex::new(inbox_rx),
                closed: CancellationToken::new(),
                hung_up: CancellationToken::new(),
                close_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue a one-line reply to the next unanswered request.
    #[must_use]
    pub fn reply(self, line: impl Into<String>) -> Self {
        self.reply_lines([line.into()])
    }

    /// Queue a multi-line reply to the next unanswered request.
    #[must_use]
    pub fn reply_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let batch = lines.into_iter().map(Into::into).collect();
        lock(&self.shared.replies).push_back(batch);
        self
    }

    /// Deliver a line the client did not ask for.
    pub fn push(&self, line: impl Into<String>) {
        // The receiver lives in `shared`, so the channel cannot be closed.
        let _ = self.shared.inbox_tx.send(Ok(line.into()));
    }

    /// Make the next read fail with `error`.
    pub fn fail_read(&self, error: ClientError) {
        let _ = self.shared.inbox_tx.send(Err(error));
    }

    /// Peer closes its side: reads drain what is queued, then end.
    pub fn hang_up(&self) {
        self.shared.hung_up.cancel();
    }

    /// Lines written by the client, in order.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.shared.sent).clone()
    }

    /// Number of times [`LineTransport::close`] was called.
    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    /// Scripted replies not yet released.
    pub fn pending_replies(&self) -> usize {
        lock(&self.shared.replies).len()
    }
}

impl LineTransport for MockTransport {
    async fn send_line(&self, line: &str) -> Result<(), ClientError> {
        if self.shared.closed.is_cancelled() {
            return Err(ClientError::ConnectionClosed);
        }
        lock(&self.shared.sent).push(line.to_owned());

        if let Some(batch) = lock(&self.shared.replies).pop_front() {
            for reply in batch {
                let _ = self.shared.inbox_tx.send(Ok(reply));
            }
        }
        Ok(())
    }

    async fn receive_line(&self) -> Result<Option<String>, ClientError> {
        if self.shared.closed.is_cancelled() {
            return Err(ClientError::ConnectionClosed);
        }
        let mut inbox = self.shared.inbox_rx.lock().await;

        tokio::select! {
            biased;
            () = self.shared.closed.cancelled() => Ok(None),
            delivery = inbox.recv() => delivery.transpose(),
            () = self.shared.hung_up.cancelled() => inbox.try_recv().ok().transpose(),
        }
    }

    async fn close(&self) {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.closed.cancel();
    }

    fn is_open(&self) -> bool {
        !self.shared.closed.is_cancelled()
    }
}

/// [`Connector`] handing out prepared [`MockTransport`]s in order.
#[derive(Clone, Default)]
pub struct MockConnector {
    transports: Arc<Mutex<VecDeque<MockTransport>>>,
    dialed: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    /// Connector that yields `transport` on the first connect.
    pub fn new(transport: MockTransport) -> Self {
        Self::default().then(transport)
    }

    /// Connector with nothing to hand out: every connect is refused.
    pub fn refusing() -> Self {
        Self::default()
    }

    /// Queue another transport for a later connect.
    #[must_use]
    pub fn then(self, transport: MockTransport) -> Self {
        lock(&self.transports).push_back(transport);
        self
    }

    /// Addresses dialed so far, as `host:port`.
    pub fn dialed(&self) -> Vec<String> {
        lock(&self.dialed).clone()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, host: &str, port: u16) -> Result<MockTransport, ClientError> {
        let addr = format!("{host}:{port}");
        lock(&self.dialed).push(addr.clone());

        lock(&self.transports)
            .pop_front()
            .ok_or(ClientError::Connect { addr, reason: "connection refused".into() })
    }
}

/// Lock ignoring poison: a panicking test thread must not hide the script
/// state from the assertions that follow.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
