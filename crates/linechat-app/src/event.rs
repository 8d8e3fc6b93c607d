//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the
//! [`crate::App`] state machine. All of them originate from the
//! [`crate::Bridge`]: completions of session operations and lines pushed by
//! the server. User input arrives separately as [`crate::UserInput`].

use linechat_client::{ErrorKind, Incoming};

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Connection attempt started.
    Connecting,

    /// Login succeeded.
    LoggedIn {
        /// Authenticated account name.
        username: String,
    },

    /// Login did not succeed (rejected, unreachable or malformed reply).
    LoginFailed {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Human-readable reason.
        reason: String,
    },

    /// Contact list fetched.
    ContactsUpdated(Vec<String>),

    /// History of a conversation fetched.
    HistoryLoaded {
        /// Conversation partner.
        contact: String,
        /// Display-ready lines.
        lines: Vec<String>,
    },

    /// Message acknowledged by the server.
    MessageSent {
        /// Local echo, `[You]: body`.
        echo: String,
    },

    /// Server refused a message.
    SendFailed {
        /// Server's reason.
        reason: String,
    },

    /// Line pushed by the server.
    MessageReceived(Incoming),

    /// Session ended. `reason` is `None` after a requested logout.
    Disconnected {
        /// Why the connection went away.
        reason: Option<String>,
    },

    /// Operation failed.
    Failed {
        /// Classification, `None` for internal failures.
        kind: Option<ErrorKind>,
        /// Human-readable description.
        message: String,
    },
}
