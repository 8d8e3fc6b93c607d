//! Background listener for server-pushed messages.
//!
//! One task per session reads lines outside request exchanges and forwards
//! them to the UI. Lines are only forwarded while a contact is selected; the
//! server has no notion of an open conversation, so anything that arrives
//! before a selection is logged and dropped.
//!
//! The listener never closes the connection. It stops when the stream ends,
//! a read fails, the subscriber goes away, or [`ListenerHandle::stop`] is
//! called.

use std::sync::Arc;

use linechat_proto::{MessageRecord, decode_incoming};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{ClientError, LineTransport, Link};

/// Unsolicited line delivered to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Structured `sender|receiver|body` record.
    Message(MessageRecord),
    /// Any other non-blank line, verbatim.
    Raw(String),
}

/// Why the listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerExit {
    /// Peer closed the stream, or the connection was closed locally.
    EndOfStream,
    /// Read failed.
    Failed(ClientError),
    /// [`ListenerHandle::stop`] was called.
    Stopped,
    /// Receiving end of the sink was dropped.
    SubscriberGone,
}

/// Handle to a running listener task.
pub struct ListenerHandle {
    stop: CancellationToken,
    task: JoinHandle<ListenerExit>,
}

impl ListenerHandle {
    /// Ask the listener to stop. Does not wait for it.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to finish.
    ///
    /// A panicked or aborted task is reported as [`ListenerExit::Failed`].
    pub async fn join(self) -> ListenerExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => ListenerExit::Failed(ClientError::Io(format!("listener task failed: {e}"))),
        }
    }
}

/// Spawn the listener on the current runtime.
///
/// `selected` tracks the open conversation; lines arriving while it is
/// `None` are dropped.
pub fn spawn<T: LineTransport>(
    link: Arc<Link<T>>,
    selected: watch::Receiver<Option<String>>,
    sink: mpsc::UnboundedSender<Incoming>,
) -> ListenerHandle {
    let stop = CancellationToken::new();
    let task = tokio::spawn(run(link, selected, sink, stop.clone()));
    ListenerHandle { stop, task }
}

async fn run<T: LineTransport>(
    link: Arc<Link<T>>,
    selected: watch::Receiver<Option<String>>,
    sink: mpsc::UnboundedSender<Incoming>,
    stop: CancellationToken,
) -> ListenerExit {
    tracing::debug!("listener started");

    let exit = loop {
        let line = tokio::select! {
            biased;
            () = stop.cancelled() => break ListenerExit::Stopped,
            () = sink.closed() => break ListenerExit::SubscriberGone,
            line = link.next_unsolicited() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break ListenerExit::EndOfStream,
            Err(e) => break ListenerExit::Failed(e),
        };

        if line.trim().is_empty() {
            continue;
        }

        if selected.borrow().is_none() {
            tracing::debug!(line = %line, "no conversation open, dropping incoming line");
            continue;
        }

        let incoming = match decode_incoming(&line) {
            Some(record) => Incoming::Message(record),
            None => Incoming::Raw(line),
        };
        if sink.send(incoming).is_err() {
            break ListenerExit::SubscriberGone;
        }
    };

    match &exit {
        ListenerExit::Failed(e) => tracing::warn!(error = %e, "listener stopped"),
        other => tracing::debug!(exit = ?other, "listener stopped"),
    }
    exit
}
