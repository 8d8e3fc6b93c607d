//! Error types for the client layer.
//!
//! Every failure surfaced to the UI is one [`ClientError`]. The UI groups them
//! by [`ErrorKind`]: a server rejecting a request ([`ErrorKind::Failure`]) is a
//! normal outcome and must read differently from a broken connection.

use std::{io, time::Duration};

use linechat_proto::{EncodeError, Response};
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors produced by connections, sessions and the listener.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Socket could not be established (refused, unreachable, DNS failure,
    /// connect timeout).
    #[error("could not connect to {addr}: {reason}")]
    Connect {
        /// Address that was dialed (host:port)
        addr: String,
        /// Underlying cause
        reason: String,
    },

    /// Read or write failure on an established connection.
    #[error("I/O error: {0}")]
    Io(String),

    /// Connection is closed, or the peer closed it while a reply was due.
    #[error("connection closed")]
    ConnectionClosed,

    /// No reply within the configured read timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Peer sent a line longer than the configured limit.
    #[error("incoming line exceeds the length limit")]
    LineTooLong,

    /// Response does not have the shape expected for its request.
    #[error("unexpected response: expected {expected}, got {raw:?}")]
    Protocol {
        /// Shape that was expected
        expected: &'static str,
        /// Text that was received
        raw: String,
    },

    /// Operation invoked without the session state it needs.
    #[error("{0}")]
    State(&'static str),

    /// Message body is empty after trimming.
    #[error("message is empty")]
    EmptyMessage,

    /// Server explicitly rejected the request.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// Request fields cannot be written as one wire line.
    #[error("cannot encode request: {0}")]
    Encode(#[from] EncodeError),
}

/// Coarse error classification for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Could not reach the server.
    Connect,
    /// Connection broke after it was established.
    Io,
    /// Server reply could not be interpreted.
    Protocol,
    /// Missing session state or invalid user input.
    State,
    /// Server said no.
    Failure,
}

impl ClientError {
    /// Classify for display.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } => ErrorKind::Connect,
            Self::Io(_) | Self::ConnectionClosed | Self::Timeout(_) => ErrorKind::Io,
            Self::LineTooLong | Self::Protocol { .. } => ErrorKind::Protocol,
            Self::State(_) | Self::EmptyMessage | Self::Encode(_) => ErrorKind::State,
            Self::Rejected(_) => ErrorKind::Failure,
        }
    }

    /// Protocol error for a response of the wrong shape.
    pub(crate) fn unexpected(expected: &'static str, response: &Response) -> Self {
        let raw = match response {
            Response::Raw(text) | Response::Failure(text) | Response::Token(text) => text.clone(),
            other => format!("{other:?}"),
        };
        Self::Protocol { expected, raw }
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<LinesCodecError> for ClientError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => Self::LineTooLong,
            LinesCodecError::Io(err) => err.into(),
        }
    }
}
