//! Post-login session state and chat operations.
//!
//! A [`Session`] is created logged out. [`Session::login`] opens the
//! connection and fixes the encoding [`Profile`] for its lifetime; every
//! other network operation reuses that connection through a shared [`Link`].
//!
//! # Invariants
//!
//! - Identity, profile and link are either all set (logged in) or all unset.
//! - A failed login leaves the session exactly as it was and closes the
//!   connection it opened.
//! - Operations that fail a precondition write nothing to the wire.

use std::sync::Arc;

use linechat_proto::{
    DecodeContext, Profile, ProfileKind, Request, RequestKind, Response, ResponseFraming, decode,
};
use tokio::sync::{mpsc, watch};

use crate::{
    ClientError, Connector, Incoming, Link, ListenerHandle, SessionConfig, listener,
};

/// Authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account name, as sent at login.
    pub username: String,
    /// Opaque token issued by the server.
    pub token: Option<String>,
}

/// Chat session over one connection.
pub struct Session<C: Connector> {
    connector: C,
    config: SessionConfig,
    link: Option<Arc<Link<C::Transport>>>,
    profile: Option<Profile>,
    identity: Option<Identity>,
    contacts: Vec<String>,
    selected: watch::Sender<Option<String>>,
    history: Vec<String>,
}

impl<C: Connector> Session<C> {
    /// Logged-out session.
    pub fn new(connector: C, config: SessionConfig) -> Self {
        let (selected, _) = watch::channel(None);
        Self {
            connector,
            config,
            link: None,
            profile: None,
            identity: None,
            contacts: Vec::new(),
            selected,
            history: Vec::new(),
        }
    }

    /// Open a connection to `host:port` and authenticate.
    ///
    /// `credential` is the password for dialects that need one.
    ///
    /// # Errors
    ///
    /// - [`ClientError::State`] if already logged in
    /// - [`ClientError::Encode`] if the username or password cannot be sent
    /// - [`ClientError::Connect`] if the server is unreachable
    /// - [`ClientError::Rejected`] if the server refuses the credentials
    /// - [`ClientError::Protocol`] if the reply is not a token, or is a token
    ///   the host-prefixed dialect could not send back as one wire field
    pub async fn login(
        &mut self,
        host: &str,
        port: u16,
        username: &str,
        credential: Option<&str>,
    ) -> Result<Identity, ClientError> {
        if self.identity.is_some() {
            return Err(ClientError::State("already logged in"));
        }

        let username = username.trim();
        let profile = Profile::from_kind(self.config.profile, host, port, self.config.separator);
        let request = Request::Login {
            username: username.to_owned(),
            password: credential.map(str::to_owned),
        };
        let line = request.encode(&profile)?;

        let transport = self.connector.connect(host, port).await?;
        let link = Arc::new(Link::new(transport, &self.config.connection));

        let outcome = match link.exchange(&line, framing(&profile, RequestKind::Login)).await {
            Ok(text) => {
                let ctx = DecodeContext { separator: profile.separator(), self_username: username };
                match decode(RequestKind::Login, &text, &ctx) {
                    Response::Token(token)
                        if profile.kind() == ProfileKind::HostPrefixed
                            && token.contains(char::is_whitespace) =>
                    {
                        Err(ClientError::Protocol { expected: "login token", raw: token })
                    },
                    Response::Token(token) => Ok(token),
                    Response::Failure(reason) => Err(ClientError::Rejected(reason)),
                    other => Err(ClientError::unexpected("login token", &other)),
                }
            },
            Err(e) => Err(e),
        };

        let token = match outcome {
            Ok(token) => token,
            Err(e) => {
                tracing::info!(username, error = %e, "login failed");
                link.close().await;
                return Err(e);
            },
        };

        let identity = Identity { username: username.to_owned(), token: Some(token) };
        tracing::info!(username, profile = %profile.kind(), "logged in");

        self.link = Some(link);
        self.profile = Some(profile);
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Fetch the contact list and remember it.
    ///
    /// # Errors
    ///
    /// [`ClientError::State`] when logged out, [`ClientError::Protocol`] when
    /// the reply is not a list, and transport errors.
    pub async fn list_contacts(&mut self) -> Result<Vec<String>, ClientError> {
        let identity = self.identity()?;
        let request = Request::ListContacts {
            username: identity.username.clone(),
            token: identity.token.clone(),
        };

        match self.round_trip(&request).await? {
            Response::ContactList(contacts) => {
                tracing::debug!(count = contacts.len(), "contacts loaded");
                self.contacts.clone_from(&contacts);
                Ok(contacts)
            },
            other => Err(ClientError::unexpected("contact list", &other)),
        }
    }

    /// Open the conversation with `name`. No I/O.
    ///
    /// Changing the selection clears the displayed history.
    ///
    /// # Errors
    ///
    /// [`ClientError::State`] if the name is empty or not in the last
    /// fetched contact list.
    pub fn select_contact(&mut self, name: &str) -> Result<(), ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::State("contact name is empty"));
        }
        if !self.contacts.iter().any(|c| c == name) {
            return Err(ClientError::State("unknown contact"));
        }

        let changed = self.selected.send_if_modified(|current| {
            if current.as_deref() == Some(name) {
                return false;
            }
            *current = Some(name.to_owned());
            true
        });
        if changed {
            self.history.clear();
            tracing::debug!(contact = name, "conversation selected");
        }
        Ok(())
    }

    /// Fetch the history of the selected conversation.
    ///
    /// Returns display-ready lines and keeps them as the current history.
    ///
    /// # Errors
    ///
    /// [`ClientError::State`] when logged out or nothing is selected, and
    /// transport errors.
    pub async fn load_history(&mut self) -> Result<Vec<String>, ClientError> {
        let identity = self.identity()?;
        let contact = self.selected_contact().ok_or(ClientError::State("no contact selected"))?;
        let request = Request::ListMessages {
            username: identity.username.clone(),
            token: identity.token.clone(),
            contact,
        };
        let username = identity.username.clone();

        match self.round_trip(&request).await? {
            Response::MessageList(lines) => {
                self.history = lines.iter().map(|line| line.display(&username)).collect();
                Ok(self.history.clone())
            },
            other => Err(ClientError::unexpected("message history", &other)),
        }
    }

    /// Send `body` to the selected contact.
    ///
    /// Returns the local echo (`[You]: body`), which is also appended to the
    /// history.
    ///
    /// # Errors
    ///
    /// - [`ClientError::State`] when logged out or nothing is selected
    /// - [`ClientError::EmptyMessage`] if `body` is blank
    /// - [`ClientError::Rejected`] if the server does not acknowledge
    pub async fn send_chat(&mut self, body: &str) -> Result<String, ClientError> {
        let identity = self.identity()?;
        let receiver = self.selected_contact().ok_or(ClientError::State("no contact selected"))?;
        let body = body.trim();
        if body.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let request = Request::SendMessage {
            sender: identity.username.clone(),
            token: identity.token.clone(),
            receiver,
            body: body.to_owned(),
        };

        match self.round_trip(&request).await? {
            Response::Ack => {
                let echo = format!("[You]: {body}");
                self.history.push(echo.clone());
                Ok(echo)
            },
            Response::Failure(reason) => Err(ClientError::Rejected(reason)),
            other => Err(ClientError::unexpected("acknowledgement", &other)),
        }
    }

    /// Close the connection and forget all session state. No-op when logged
    /// out.
    pub async fn logout(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
        }
        if let Some(identity) = self.identity.take() {
            tracing::info!(username = %identity.username, "logged out");
        }
        self.profile = None;
        self.contacts.clear();
        self.history.clear();
        self.selected.send_replace(None);
    }

    /// Start the background listener on this session's connection.
    ///
    /// Messages are delivered to `sink` while a conversation is selected.
    ///
    /// # Errors
    ///
    /// [`ClientError::State`] when logged out.
    pub fn listen(
        &self,
        sink: mpsc::UnboundedSender<Incoming>,
    ) -> Result<ListenerHandle, ClientError> {
        let link = self.link.as_ref().ok_or(ClientError::State("not logged in"))?;
        Ok(listener::spawn(Arc::clone(link), self.selected.subscribe(), sink))
    }

    /// Shared connection, when logged in.
    pub fn link(&self) -> Option<Arc<Link<C::Transport>>> {
        self.link.clone()
    }

    /// Whether a login succeeded and no logout followed.
    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Logged-in user.
    pub fn current_identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Encoding profile fixed at login.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Contacts from the last successful fetch, in server order.
    pub fn contacts(&self) -> &[String] {
        &self.contacts
    }

    /// Open conversation.
    pub fn selected_contact(&self) -> Option<String> {
        self.selected.borrow().clone()
    }

    /// Display lines of the open conversation.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn identity(&self) -> Result<&Identity, ClientError> {
        self.identity.as_ref().ok_or(ClientError::State("not logged in"))
    }

    /// Encode, exchange and decode one request on the open connection.
    async fn round_trip(&self, request: &Request) -> Result<Response, ClientError> {
        let (Some(link), Some(profile), Some(identity)) =
            (&self.link, &self.profile, &self.identity)
        else {
            return Err(ClientError::State("not logged in"));
        };

        let line = request.encode(profile)?;
        if !link.is_open() {
            return Err(ClientError::ConnectionClosed);
        }

        let text = link.exchange(&line, framing(profile, request.kind())).await?;
        let ctx =
            DecodeContext { separator: profile.separator(), self_username: &identity.username };
        Ok(decode(request.kind(), &text, &ctx))
    }
}

/// Login and send replies are always one line; only list replies can span
/// several.
fn framing(profile: &Profile, kind: RequestKind) -> ResponseFraming {
    match kind {
        RequestKind::Login | RequestKind::SendMessage => ResponseFraming::SingleLine,
        RequestKind::ListContacts | RequestKind::ListMessages => profile.framing(),
    }
}
