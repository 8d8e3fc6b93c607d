//! Session-to-Application translation layer.
//!
//! The [`Bridge`] owns the [`linechat_client::Session`] and runs its
//! operations off the UI loop, reporting every completion back as an
//! [`crate::AppEvent`].
//!
//! # Responsibilities
//!
//! - Executes session operations strictly in the order the App asked for
//!   them, each on its own task, so the UI never blocks on the network.
//! - Converts results and [`linechat_client::ClientError`]s into
//!   [`crate::AppEvent`]s. A panicking operation becomes
//!   [`crate::AppEvent::Failed`] instead of taking the front-end down.
//! - Starts the background listener after login when configured, and turns
//!   its output into [`crate::AppEvent::MessageReceived`].
//! - On logout, closes the connection before waiting for the session, so an
//!   operation stuck on a silent server is released immediately. A login
//!   still waiting for its reply is abandoned, which drops its connection.

use std::sync::{Arc, PoisonError};

use linechat_client::{
    ClientError, Connector, Incoming, LineTransport, Link, ListenerExit, ListenerHandle, Session,
};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{AppAction, AppEvent};

/// Address the bridge logs in to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl std::fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Connection of the current login, reachable without the session lock.
struct Active<T> {
    link: Arc<Link<T>>,
    listener: CancellationToken,
}

impl<T: LineTransport> Active<T> {
    async fn shutdown(self) {
        self.listener.cancel();
        self.link.close().await;
    }
}

/// Queued session operation.
struct Op {
    action: AppAction,
    /// Set for logins: cancelled when the login is abandoned.
    abort: Option<CancellationToken>,
}

struct Shared<C: Connector> {
    session: Mutex<Session<C>>,
    /// Never held across an await.
    active: std::sync::Mutex<Option<Active<C::Transport>>>,
    /// Abort handle of the queued or running login. Never held across an
    /// await.
    pending_login: std::sync::Mutex<Option<CancellationToken>>,
    events: mpsc::UnboundedSender<AppEvent>,
    target: ServerTarget,
    listen: bool,
}

impl<C: Connector> Shared<C> {
    fn emit(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("app event receiver dropped");
        }
    }

    fn set_active(&self, active: Active<C::Transport>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(active);
    }

    fn take_active(&self) -> Option<Active<C::Transport>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Abandon the queued or running login, if any.
    fn abort_login(&self) {
        let pending = self.pending_login.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(abort) = pending {
            abort.cancel();
        }
    }

    fn finish_login(&self) {
        self.pending_login.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Stop the listener and close the connection of the current login.
    async fn disconnect(&self) {
        if let Some(active) = self.take_active() {
            active.shutdown().await;
        }
    }
}

/// Bridge between App and the client session.
///
/// Must be created inside a tokio runtime.
pub struct Bridge<C: Connector> {
    shared: Arc<Shared<C>>,
    ops: mpsc::UnboundedSender<Op>,
    worker: JoinHandle<()>,
}

impl<C: Connector> Bridge<C> {
    /// Start a bridge for `session`, reporting to `events`.
    pub fn spawn(
        session: Session<C>,
        target: ServerTarget,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let listen = session.config().listen;
        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            active: std::sync::Mutex::new(None),
            pending_login: std::sync::Mutex::new(None),
            events,
            target,
            listen,
        });
        let (ops, queue) = mpsc::unbounded_channel();
        let worker = tokio::spawn(work(Arc::clone(&shared), queue));

        Self { shared, ops, worker }
    }

    /// Queue a session operation. Returns immediately.
    ///
    /// [`AppAction::Render`] and [`AppAction::Quit`] are ignored.
    pub fn process_app_action(&self, action: AppAction) {
        if !action.is_session_op() {
            return;
        }

        // Release any operation blocked on the network before the logout
        // itself waits its turn for the session.
        if action == AppAction::Logout {
            self.shared.abort_login();
            if let Some(active) = self.shared.take_active() {
                tokio::spawn(active.shutdown());
            }
        }

        let abort = matches!(action, AppAction::Login { .. }).then(|| {
            let abort = CancellationToken::new();
            *self.shared.pending_login.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(abort.clone());
            abort
        });

        if self.ops.send(Op { action, abort }).is_err() {
            tracing::warn!("bridge worker is gone, dropping action");
        }
    }

    /// Server this bridge logs in to.
    pub fn target(&self) -> &ServerTarget {
        &self.shared.target
    }

    /// Log out if needed and wait for queued operations to finish.
    pub async fn shutdown(self) {
        self.shared.abort_login();
        self.shared.disconnect().await;
        let Self { shared, ops, worker } = self;
        drop(ops);
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "bridge worker failed");
        }
        shared.session.lock().await.logout().await;
    }
}

/// Run queued operations one at a time, each on its own task.
async fn work<C: Connector>(shared: Arc<Shared<C>>, mut queue: mpsc::UnboundedReceiver<Op>) {
    while let Some(Op { action, abort }) = queue.recv().await {
        let name = action.name();
        let task = tokio::spawn(execute(Arc::clone(&shared), action, abort));

        if let Err(e) = task.await {
            tracing::error!(action = name, error = %e, "session operation panicked");
            shared.emit(AppEvent::Failed { kind: None, message: format!("{name} failed: {e}") });
        }
    }
    tracing::debug!("bridge worker stopped");
}

async fn execute<C: Connector>(
    shared: Arc<Shared<C>>,
    action: AppAction,
    abort: Option<CancellationToken>,
) {
    let mut session = shared.session.lock().await;

    match action {
        AppAction::Login { username, password } => {
            let abort = abort.unwrap_or_default();
            if abort.is_cancelled() {
                tracing::debug!("login abandoned before it started");
                shared.emit(AppEvent::Disconnected { reason: None });
                return;
            }

            shared.emit(AppEvent::Connecting);
            let target = &shared.target;
            // Dropping an unfinished login drops the connection it opened and
            // leaves the session logged out.
            let result = tokio::select! {
                biased;
                () = abort.cancelled() => None,
                result = session.login(&target.host, target.port, &username, password.as_deref()) => {
                    Some(result)
                },
            };
            shared.finish_login();

            let Some(result) = result else {
                tracing::info!(username = %username, "login abandoned");
                shared.emit(AppEvent::Disconnected { reason: None });
                return;
            };
            match result {
                Ok(identity) => {
                    if let Some(link) = session.link() {
                        let listener = CancellationToken::new();
                        if shared.listen {
                            start_listener(&shared, &session, listener.clone());
                        }
                        shared.set_active(Active { link, listener });
                    }
                    shared.emit(AppEvent::LoggedIn { username: identity.username });
                },
                Err(e) => {
                    shared.emit(AppEvent::LoginFailed { kind: e.kind(), reason: e.to_string() });
                },
            }
        },
        AppAction::ListContacts => match session.list_contacts().await {
            Ok(contacts) => shared.emit(AppEvent::ContactsUpdated(contacts)),
            Err(e) => shared.emit(failed(&e)),
        },
        AppAction::SelectContact { contact } => {
            if let Err(e) = session.select_contact(&contact) {
                shared.emit(failed(&e));
            }
        },
        AppAction::LoadHistory => match session.load_history().await {
            Ok(lines) => {
                let contact = session.selected_contact().unwrap_or_default();
                shared.emit(AppEvent::HistoryLoaded { contact, lines });
            },
            Err(e) => shared.emit(failed(&e)),
        },
        AppAction::SendMessage { body } => match session.send_chat(&body).await {
            Ok(echo) => shared.emit(AppEvent::MessageSent { echo }),
            Err(ClientError::Rejected(reason)) => shared.emit(AppEvent::SendFailed { reason }),
            Err(e) => shared.emit(failed(&e)),
        },
        AppAction::Logout => {
            let was_logged_in = session.is_logged_in();
            shared.disconnect().await;
            session.logout().await;
            if was_logged_in {
                shared.emit(AppEvent::Disconnected { reason: None });
            }
        },
        AppAction::Render | AppAction::Quit => {},
    }
}

fn failed(error: &ClientError) -> AppEvent {
    AppEvent::Failed { kind: Some(error.kind()), message: error.to_string() }
}

fn start_listener<C: Connector>(
    shared: &Arc<Shared<C>>,
    session: &Session<C>,
    stop: CancellationToken,
) {
    let (sink, incoming) = mpsc::unbounded_channel();
    match session.listen(sink) {
        Ok(handle) => {
            tokio::spawn(forward(Arc::clone(shared), incoming, handle, stop));
        },
        Err(e) => shared.emit(failed(&e)),
    }
}

/// Relay listener output to the App until the listener exits or the login
/// that started it ends.
async fn forward<C: Connector>(
    shared: Arc<Shared<C>>,
    mut incoming: mpsc::UnboundedReceiver<Incoming>,
    handle: ListenerHandle,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            next = incoming.recv() => match next {
                Some(line) => shared.emit(AppEvent::MessageReceived(line)),
                None => break,
            },
        }
    }

    handle.stop();
    let exit = handle.join().await;
    if stop.is_cancelled() {
        return;
    }

    // The server went away on its own.
    let reason = match exit {
        ListenerExit::EndOfStream => "server closed the connection".to_owned(),
        ListenerExit::Failed(e) => e.to_string(),
        ListenerExit::Stopped | ListenerExit::SubscriberGone => return,
    };
    tracing::info!(reason = %reason, "connection lost");
    shared.disconnect().await;
    shared.session.lock().await.logout().await;
    shared.emit(AppEvent::Disconnected { reason: Some(reason) });
}
