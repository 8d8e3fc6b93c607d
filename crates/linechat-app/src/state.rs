//! Observable application state types.
//!
//! These structures are the view model of the front-end: the subset of
//! session state needed for rendering.

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session.
    Disconnected,
    /// Login in progress.
    Connecting,
    /// Authenticated session.
    LoggedIn {
        /// Account name.
        username: String,
    },
}

impl ConnectionState {
    /// Account name while logged in.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::LoggedIn { username } => Some(username),
            Self::Disconnected | Self::Connecting => None,
        }
    }
}

/// Open conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Conversation partner.
    pub contact: String,
    /// Display-ready lines, oldest first.
    pub lines: Vec<String>,
}

impl Conversation {
    /// Empty conversation with `contact`.
    pub fn new(contact: impl Into<String>) -> Self {
        Self { contact: contact.into(), lines: Vec::new() }
    }

    /// Append a display line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}
