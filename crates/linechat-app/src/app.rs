//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the client completely decoupled from I/O and protocol mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`]s and
//! [`crate::UserInput`] and produces [`crate::AppAction`] instructions for the
//! runtime to execute.
//!
//! # Responsibilities
//!
//! - Tracks connection state and the logged-in user.
//! - Keeps the contact list and the open conversation for rendering.
//! - Rejects user commands that cannot succeed in the current state before
//!   anything reaches the network.
//! - Maintains a one-line status for feedback.

use linechat_client::{ErrorKind, Incoming};

use crate::{AppAction, AppEvent, ConnectionState, Conversation, UserInput};

const HELP: &str = "/login <user> [password], /contacts, /select <contact>, /history, /logout, /quit; \
                    anything else is sent to the open conversation";

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Connection state.
    state: ConnectionState,
    /// Server address, for display.
    server_addr: String,
    /// Contacts in server order.
    contacts: Vec<String>,
    /// Open conversation. `None` until a contact is selected.
    conversation: Option<Conversation>,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a new App for the given server address.
    pub fn new(server_addr: String) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            server_addr,
            contacts: Vec::new(),
            conversation: None,
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Connecting => {
                self.state = ConnectionState::Connecting;
                self.status_message = Some(format!("Connecting to {}...", self.server_addr));
                vec![AppAction::Render]
            },
            AppEvent::LoggedIn { username } => {
                self.status_message = Some(format!("Logged in as {username}"));
                self.state = ConnectionState::LoggedIn { username };
                vec![AppAction::ListContacts, AppAction::Render]
            },
            AppEvent::LoginFailed { kind, reason } => {
                self.state = ConnectionState::Disconnected;
                self.status_message = Some(match kind {
                    ErrorKind::Failure => format!("Login rejected: {reason}"),
                    _ => format!("Login failed: {reason}"),
                });
                vec![AppAction::Render]
            },
            AppEvent::ContactsUpdated(contacts) => {
                self.contacts = contacts;
                if self.conversation.as_ref().is_some_and(|c| !self.contacts.contains(&c.contact)) {
                    self.conversation = None;
                }
                if self.contacts.is_empty() {
                    self.status_message = Some("No contacts".into());
                }
                vec![AppAction::Render]
            },
            AppEvent::HistoryLoaded { contact, lines } => {
                self.conversation = Some(Conversation { contact, lines });
                vec![AppAction::Render]
            },
            AppEvent::MessageSent { echo } => {
                if let Some(conversation) = &mut self.conversation {
                    conversation.push(echo);
                }
                vec![AppAction::Render]
            },
            AppEvent::SendFailed { reason } => {
                self.status_message = Some(format!("Message not sent: {reason}"));
                vec![AppAction::Render]
            },
            AppEvent::MessageReceived(incoming) => {
                let username = self.state.username().unwrap_or_default();
                let line = match incoming {
                    Incoming::Message(record) => record.display(username),
                    Incoming::Raw(text) => text,
                };
                match &mut self.conversation {
                    Some(conversation) => conversation.push(line),
                    None => tracing::debug!(line = %line, "no open conversation for incoming line"),
                }
                vec![AppAction::Render]
            },
            AppEvent::Disconnected { reason } => {
                self.state = ConnectionState::Disconnected;
                self.contacts.clear();
                self.conversation = None;
                self.status_message = Some(match reason {
                    Some(reason) => format!("Disconnected: {reason}"),
                    None => "Logged out".into(),
                });
                vec![AppAction::Render]
            },
            AppEvent::Failed { kind, message } => {
                let label = match kind {
                    Some(ErrorKind::Connect) => "Connection error",
                    Some(ErrorKind::Io) => "Network error",
                    Some(ErrorKind::Protocol) => "Unexpected response",
                    Some(ErrorKind::State) => "Not possible",
                    Some(ErrorKind::Failure) => "Rejected",
                    None => "Internal error",
                };
                self.status_message = Some(format!("{label}: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    /// Process one user command and return actions.
    pub fn apply(&mut self, input: UserInput) -> Vec<AppAction> {
        match input {
            UserInput::Login { username, password } => self.login(username, password),
            UserInput::RefreshContacts => self.refresh_contacts(),
            UserInput::Select(contact) => self.select_contact(&contact),
            UserInput::ReloadHistory => self.reload_history(),
            UserInput::Send(body) => self.send_message(body),
            UserInput::Logout => self.logout(),
            UserInput::Help => {
                self.status_message = Some(HELP.into());
                vec![AppAction::Render]
            },
            UserInput::Quit => self.quit(),
            UserInput::Unknown(line) => {
                self.status_message = Some(format!("Unknown command: {line} (try /help)"));
                vec![AppAction::Render]
            },
        }
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Log in as `username`.
    pub fn login(&mut self, username: String, password: Option<String>) -> Vec<AppAction> {
        if self.state != ConnectionState::Disconnected {
            self.status_message = Some("Already logged in".into());
            return vec![AppAction::Render];
        }
        self.state = ConnectionState::Connecting;
        vec![AppAction::Login { username, password }, AppAction::Render]
    }

    /// Fetch the contact list again.
    pub fn refresh_contacts(&mut self) -> Vec<AppAction> {
        if !self.require_login() {
            return vec![AppAction::Render];
        }
        vec![AppAction::ListContacts, AppAction::Render]
    }

    /// Open the conversation with `contact` and load its history.
    ///
    /// The conversation opens right away, matching the session's selection,
    /// so it stays usable if the history fails to load.
    pub fn select_contact(&mut self, contact: &str) -> Vec<AppAction> {
        if !self.require_login() {
            return vec![AppAction::Render];
        }
        if !self.contacts.iter().any(|c| c == contact) {
            self.status_message = Some(format!("Unknown contact: {contact}"));
            return vec![AppAction::Render];
        }
        if self.conversation.as_ref().is_none_or(|c| c.contact != contact) {
            self.conversation = Some(Conversation::new(contact));
        }
        vec![
            AppAction::SelectContact { contact: contact.to_owned() },
            AppAction::LoadHistory,
            AppAction::Render,
        ]
    }

    /// Fetch the history of the open conversation again.
    pub fn reload_history(&mut self) -> Vec<AppAction> {
        if !self.require_conversation() {
            return vec![AppAction::Render];
        }
        vec![AppAction::LoadHistory, AppAction::Render]
    }

    /// Send `body` to the open conversation.
    pub fn send_message(&mut self, body: String) -> Vec<AppAction> {
        if !self.require_conversation() {
            return vec![AppAction::Render];
        }
        if body.trim().is_empty() {
            self.status_message = Some("Message is empty".into());
            return vec![AppAction::Render];
        }
        vec![AppAction::SendMessage { body }, AppAction::Render]
    }

    /// End the session.
    pub fn logout(&mut self) -> Vec<AppAction> {
        if self.state == ConnectionState::Disconnected {
            self.status_message = Some("Not logged in".into());
            return vec![AppAction::Render];
        }
        vec![AppAction::Logout, AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Current connection state.
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// Server address (host:port).
    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Contacts in server order.
    pub fn contacts(&self) -> &[String] {
        &self.contacts
    }

    /// Open conversation. `None` if no contact is selected.
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn require_login(&mut self) -> bool {
        let logged_in = matches!(self.state, ConnectionState::LoggedIn { .. });
        if !logged_in {
            self.status_message = Some("Not logged in".into());
        }
        logged_in
    }

    fn require_conversation(&mut self) -> bool {
        if !self.require_login() {
            return false;
        }
        if self.conversation.is_none() {
            self.status_message = Some("Select a contact first".into());
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use linechat_client::MessageRecord;

    use super::*;

    fn logged_in_app() -> App {
        let mut app = App::new("localhost:5000".into());
        let _ = app.handle(AppEvent::LoggedIn { username: "alice".into() });
        let _ = app.handle(AppEvent::ContactsUpdated(vec!["bob".into(), "carol".into()]));
        app
    }

    fn with_conversation(contact: &str) -> App {
        let mut app = logged_in_app();
        let _ = app.handle(AppEvent::HistoryLoaded { contact: contact.into(), lines: vec![] });
        app
    }

    #[test]
    fn login_fetches_contacts() {
        let mut app = App::new("localhost:5000".into());
        let actions = app.login("alice".into(), None);
        assert!(matches!(actions.as_slice(), [AppAction::Login { .. }, AppAction::Render]));
        assert_eq!(app.state, ConnectionState::Connecting);

        let actions = app.handle(AppEvent::LoggedIn { username: "alice".into() });
        assert_eq!(actions, vec![AppAction::ListContacts, AppAction::Render]);
        assert_eq!(app.state.username(), Some("alice"));
    }

    #[test]
    fn login_rejection_is_reported_as_such() {
        let mut app = App::new("localhost:5000".into());
        let _ = app.login("alice".into(), None);
        let _ = app.handle(AppEvent::LoginFailed {
            kind: ErrorKind::Failure,
            reason: "Sorry, invalid credentials".into(),
        });

        assert_eq!(app.state, ConnectionState::Disconnected);
        assert_eq!(app.status_message(), Some("Login rejected: Sorry, invalid credentials"));
    }

    #[test]
    fn api_select_contact() {
        let mut app = logged_in_app();
        let actions = app.select_contact("bob");

        assert!(matches!(actions.as_slice(), [
            AppAction::SelectContact { contact },
            AppAction::LoadHistory,
            AppAction::Render
        ] if contact == "bob"));
    }

    #[test]
    fn selection_survives_failed_history_load() {
        let mut app = logged_in_app();
        let _ = app.select_contact("bob");
        let _ = app.handle(AppEvent::Failed {
            kind: Some(ErrorKind::Io),
            message: "connection reset".into(),
        });

        assert_eq!(app.conversation().map(|c| c.contact.as_str()), Some("bob"));
        assert_eq!(
            app.send_message("hi".into()),
            vec![AppAction::SendMessage { body: "hi".into() }, AppAction::Render]
        );
    }

    #[test]
    fn reselecting_keeps_open_conversation() {
        let mut app = with_conversation("bob");
        let _ = app.handle(AppEvent::MessageSent { echo: "[You]: hi".into() });

        let _ = app.select_contact("bob");
        assert_eq!(app.conversation().map(|c| c.lines.len()), Some(1));

        let _ = app.select_contact("carol");
        assert_eq!(app.conversation().map(|c| (c.contact.as_str(), c.lines.len())), Some(("carol", 0)));
    }

    #[test]
    fn unknown_contact_stays_local() {
        let mut app = logged_in_app();
        assert_eq!(app.select_contact("mallory"), vec![AppAction::Render]);
        assert_eq!(app.status_message(), Some("Unknown contact: mallory"));
    }

    #[test]
    fn send_requires_conversation_and_text() {
        let mut app = logged_in_app();
        assert_eq!(app.send_message("hi".into()), vec![AppAction::Render]);
        assert_eq!(app.status_message(), Some("Select a contact first"));

        let mut app = with_conversation("bob");
        assert_eq!(app.send_message("  ".into()), vec![AppAction::Render]);
        assert_eq!(
            app.send_message("hi".into()),
            vec![AppAction::SendMessage { body: "hi".into() }, AppAction::Render]
        );
    }

    #[test]
    fn sent_and_received_lines_join_conversation() {
        let mut app = with_conversation("bob");
        let _ = app.handle(AppEvent::MessageSent { echo: "[You]: hi".into() });
        let _ = app.handle(AppEvent::MessageReceived(Incoming::Message(MessageRecord {
            sender: "bob".into(),
            receiver: "alice".into(),
            body: "hey".into(),
        })));
        let _ = app.handle(AppEvent::MessageReceived(Incoming::Raw("server notice".into())));

        let lines = &app.conversation().map(|c| c.lines.clone()).unwrap_or_default();
        assert_eq!(lines, &["[You]: hi", "[bob]: hey", "server notice"]);
    }

    #[test]
    fn contacts_refresh_drops_vanished_conversation() {
        let mut app = with_conversation("carol");
        let _ = app.handle(AppEvent::ContactsUpdated(vec!["bob".into()]));
        assert!(app.conversation().is_none());
    }

    #[test]
    fn disconnect_clears_session_view() {
        let mut app = with_conversation("bob");
        let _ = app.handle(AppEvent::Disconnected { reason: Some("connection closed".into()) });

        assert_eq!(app.state, ConnectionState::Disconnected);
        assert!(app.contacts().is_empty());
        assert!(app.conversation().is_none());
        assert_eq!(app.status_message(), Some("Disconnected: connection closed"));
    }

    #[test]
    fn commands_need_login() {
        let mut app = App::new("localhost:5000".into());
        assert_eq!(app.refresh_contacts(), vec![AppAction::Render]);
        assert_eq!(app.logout(), vec![AppAction::Render]);
        assert_eq!(app.status_message(), Some("Not logged in"));
    }
}
