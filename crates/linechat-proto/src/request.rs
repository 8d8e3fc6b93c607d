//! Outgoing requests.
//!
//! A [`Request`] carries every field needed to write one protocol line, so
//! [`Request::encode`] is a pure function of the request and the profile.

use crate::{EncodeError, Profile};

/// Kind of a request, used to pick the decoder for its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Authenticate and obtain a token.
    Login,
    /// Fetch the contact list.
    ListContacts,
    /// Fetch the message history of a conversation.
    ListMessages,
    /// Send a chat message.
    SendMessage,
}

/// Structured protocol request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Login with username and, for the identity-first dialect, a password.
    Login {
        /// Account name.
        username: String,
        /// Password. Required by the identity-first dialect, ignored by the
        /// host-prefixed dialect.
        password: Option<String>,
    },

    /// List the user's contacts.
    ListContacts {
        /// Logged-in user.
        username: String,
        /// Token returned by login.
        token: Option<String>,
    },

    /// List messages exchanged with a contact.
    ListMessages {
        /// Logged-in user.
        username: String,
        /// Token returned by login.
        token: Option<String>,
        /// Conversation partner.
        contact: String,
    },

    /// Send a message.
    SendMessage {
        /// Logged-in user.
        sender: String,
        /// Token returned by login.
        token: Option<String>,
        /// Recipient contact.
        receiver: String,
        /// Message text. May contain spaces, never line breaks.
        body: String,
    },
}

impl Request {
    /// Kind of this request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Login { .. } => RequestKind::Login,
            Self::ListContacts { .. } => RequestKind::ListContacts,
            Self::ListMessages { .. } => RequestKind::ListMessages,
            Self::SendMessage { .. } => RequestKind::SendMessage,
        }
    }

    /// Encode as a single wire line, without the line terminator.
    ///
    /// # Invariants
    ///
    /// - Deterministic: the same request and profile always yield the same
    ///   line.
    /// - Never produces a line the peer would split differently: fields that
    ///   occupy one wire token are rejected if empty or containing
    ///   whitespace, and no field may contain a line break.
    pub fn encode(&self, profile: &Profile) -> Result<String, EncodeError> {
        let opcode = profile.opcode(self.kind());

        match profile {
            Profile::HostPrefixed { host, port, .. } => {
                let host = word("host", host)?;
                match self {
                    Self::Login { username, .. } => {
                        let username = word("username", username)?;
                        Ok(format!("{host} {port} {opcode} {username}"))
                    },
                    Self::ListContacts { token, .. } | Self::ListMessages { token, .. } => {
                        let token = required_token(token.as_deref())?;
                        Ok(format!("{host} {port} {opcode} {token}"))
                    },
                    Self::SendMessage { token, receiver, body, .. } => {
                        let token = required_token(token.as_deref())?;
                        let receiver = word("receiver", receiver)?;
                        let body = text("body", body)?;
                        Ok(format!("{host} {port} {opcode} {token} {receiver} {body}"))
                    },
                }
            },
            Profile::IdentityFirst { .. } => match self {
                Self::Login { username, password } => {
                    let username = word("username", username)?;
                    let password = password.as_deref().ok_or(EncodeError::MissingPassword)?;
                    let password = word("password", password)?;
                    Ok(format!("{username} {password} {opcode}"))
                },
                Self::ListContacts { username, .. } => {
                    let username = word("username", username)?;
                    Ok(format!("{username} {opcode}"))
                },
                Self::ListMessages { username, contact, .. } => {
                    let username = word("username", username)?;
                    let contact = word("contact", contact)?;
                    Ok(format!("{username} {contact} {opcode}"))
                },
                Self::SendMessage { sender, receiver, body, .. } => {
                    let sender = word("sender", sender)?;
                    let receiver = word("receiver", receiver)?;
                    let body = text("body", body)?;
                    Ok(format!("{sender} {receiver} {body} {opcode}"))
                },
            },
        }
    }
}

fn required_token(token: Option<&str>) -> Result<&str, EncodeError> {
    let token = token.ok_or(EncodeError::MissingToken)?;
    word("token", token)
}

/// A field that occupies exactly one space-delimited wire token.
fn word<'a>(field: &'static str, value: &'a str) -> Result<&'a str, EncodeError> {
    let value = text(field, value)?;
    if value.chars().any(char::is_whitespace) {
        return Err(EncodeError::Whitespace(field));
    }
    Ok(value)
}

/// A trailing free-text field. Surrounding whitespace is not significant.
fn text<'a>(field: &'static str, value: &'a str) -> Result<&'a str, EncodeError> {
    if value.contains(['\n', '\r']) {
        return Err(EncodeError::LineBreak(field));
    }
    let value = value.trim();
    if value.is_empty() {
        return Err(EncodeError::EmptyField(field));
    }
    Ok(value)
}
