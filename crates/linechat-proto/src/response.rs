//! Incoming responses.
//!
//! Decoding never fails: every line maps to some [`Response`]. Text that does
//! not match the shape expected for the request that produced it is surfaced
//! as [`Response::Raw`] so the caller can show it instead of dropping it.

use crate::{RequestKind, Separator};

/// Decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Opaque credential issued at login.
    Token(String),
    /// Contact names in server order.
    ContactList(Vec<String>),
    /// Conversation history in arrival order.
    MessageList(Vec<HistoryLine>),
    /// Request accepted.
    Ack,
    /// Request explicitly rejected by the server, with its text.
    Failure(String),
    /// Text with no known shape for the request kind.
    Raw(String),
}

/// One chat message parsed from a `sender|receiver|body` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Author of the message.
    pub sender: String,
    /// Second record field. Carried through but never displayed.
    pub receiver: String,
    /// Message text.
    pub body: String,
}

impl MessageRecord {
    /// Display form relative to the session user: `[You]: body` for own
    /// messages, `[sender]: body` otherwise.
    pub fn display(&self, self_username: &str) -> String {
        if self.sender == self_username {
            format!("[You]: {}", self.body)
        } else {
            format!("[{}]: {}", self.sender, self.body)
        }
    }
}

/// One entry of a message-history response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryLine {
    /// Structured record.
    Record(MessageRecord),
    /// Bare text kept verbatim.
    Text(String),
}

impl HistoryLine {
    /// Display-ready text.
    pub fn display(&self, self_username: &str) -> String {
        match self {
            Self::Record(record) => record.display(self_username),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Per-session inputs to decoding.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Separator between records of a multi-record response.
    pub separator: Separator,
    /// Session user, for `[You]` attribution.
    pub self_username: &'a str,
}

/// Decode the response text for a request of the given kind.
pub fn decode(kind: RequestKind, text: &str, ctx: &DecodeContext<'_>) -> Response {
    match kind {
        RequestKind::Login => decode_login(text),
        RequestKind::ListContacts => decode_contacts(text, ctx.separator),
        RequestKind::ListMessages => decode_history(text, ctx.separator),
        RequestKind::SendMessage => decode_send(text),
    }
}

/// Decode an unsolicited line pushed by the server.
///
/// Returns `None` when the line is not a `sender|receiver|body` record; the
/// caller should surface it as raw text.
pub fn decode_incoming(line: &str) -> Option<MessageRecord> {
    parse_record(line.trim())
}

/// Split a multi-record response into records.
///
/// Real line breaks always separate records. Literal separators split each
/// physical line further.
pub fn split_records(text: &str, separator: Separator) -> Vec<&str> {
    text.lines()
        .flat_map(|line| match separator.literal() {
            Some(literal) => line.split(literal).collect::<Vec<_>>(),
            None => vec![line],
        })
        .collect()
}

fn decode_login(text: &str) -> Response {
    let token = text.trim();
    let lowered = token.to_lowercase();
    if token.is_empty() || lowered.contains("invalid") || lowered.contains("sorry") {
        Response::Failure(text.to_owned())
    } else {
        Response::Token(token.to_owned())
    }
}

fn decode_send(text: &str) -> Response {
    if text.contains("OK") { Response::Ack } else { Response::Failure(text.to_owned()) }
}

fn decode_contacts(text: &str, separator: Separator) -> Response {
    let contacts: Vec<String> = split_records(text, separator)
        .into_iter()
        .map(|entry| strip_ordinal(entry.trim()))
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect();

    // A contact name is one wire token. Whitespace means the server sent a
    // sentence (an error message, a notice), not a list.
    if contacts.iter().any(|name| name.chars().any(char::is_whitespace)) {
        return Response::Raw(text.to_owned());
    }

    Response::ContactList(contacts)
}

fn decode_history(text: &str, separator: Separator) -> Response {
    let lines = split_records(text, separator)
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| match parse_record(entry.trim()) {
            Some(record) => HistoryLine::Record(record),
            None => HistoryLine::Text(entry.to_owned()),
        })
        .collect();

    Response::MessageList(lines)
}

/// Strip a leading `"<digits>. "` ordinal.
fn strip_ordinal(entry: &str) -> &str {
    match entry.split_once(". ") {
        Some((number, rest)) if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
            rest.trim()
        },
        _ => entry,
    }
}

fn parse_record(entry: &str) -> Option<MessageRecord> {
    let fields: Vec<&str> = entry.split('|').collect();
    if fields.len() < 3 {
        return None;
    }
    Some(MessageRecord {
        sender: fields[0].trim().to_owned(),
        receiver: fields[1].trim().to_owned(),
        body: fields[2].trim().to_owned(),
    })
}
