//! Encoding errors.
//!
//! Decoding is infallible by construction (unknown shapes become
//! [`crate::Response::Raw`]), so only the encoder has an error type.

use thiserror::Error;

/// Reasons a [`crate::Request`] cannot be written as a single wire line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A required field is empty.
    #[error("field `{0}` is empty")]
    EmptyField(&'static str),

    /// A single-token field contains whitespace, which would shift every
    /// following argument on the wire.
    #[error("field `{0}` must not contain whitespace")]
    Whitespace(&'static str),

    /// A field contains a line break, which would split the request in two.
    #[error("field `{0}` must not contain a line break")]
    LineBreak(&'static str),

    /// The host-prefixed dialect needs the login token for this request.
    #[error("request requires an auth token")]
    MissingToken,

    /// The identity-first dialect sends a password with login.
    #[error("login requires a password")]
    MissingPassword,
}
