//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Connect and authenticate.
    Login {
        /// Account name.
        username: String,
        /// Password, for dialects that take one.
        password: Option<String>,
    },

    /// Fetch the contact list.
    ListContacts,

    /// Open the conversation with a contact.
    SelectContact {
        /// Contact name, as listed by the server.
        contact: String,
    },

    /// Fetch the history of the open conversation.
    LoadHistory,

    /// Send a message to the open conversation.
    SendMessage {
        /// Message text.
        body: String,
    },

    /// Close the connection and forget the session.
    Logout,
}

impl AppAction {
    /// Whether the action needs the session (and therefore the bridge).
    pub fn is_session_op(&self) -> bool {
        !matches!(self, Self::Render | Self::Quit)
    }

    /// Short name for logs. Never includes message text or credentials.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Quit => "quit",
            Self::Login { .. } => "login",
            Self::ListContacts => "list contacts",
            Self::SelectContact { .. } => "select contact",
            Self::LoadHistory => "load history",
            Self::SendMessage { .. } => "send message",
            Self::Logout => "logout",
        }
    }
}
