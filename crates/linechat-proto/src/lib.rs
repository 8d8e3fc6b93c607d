//! Linechat wire protocol.
//!
//! The protocol is plain text: one request per line, one response per line,
//! no message identifiers and no length prefixes. A response line may itself
//! carry several logical records joined by an in-band separator.
//!
//! Two historical dialects exist and both are supported as encoding
//! [`Profile`]s behind the same [`Request`] / [`Response`] types:
//!
//! - [`Profile::HostPrefixed`]: `<host> <port> <opcode> <token> [args...]`
//! - [`Profile::IdentityFirst`]: `<username> [args...] <opcode>`
//!
//! This crate is pure: encoding and decoding never touch the network, so the
//! same code runs in production, in simulation and under the fuzzer.
//!
//! # Components
//!
//! - [`Request`]: structured intent, encoded with [`Request::encode`]
//! - [`Response`]: decoded response, produced by [`decode`]
//! - [`Profile`]: dialect selection, chosen once per session
//! - [`Separator`]: record separator inside multi-record responses

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod profile;
mod request;
mod response;

pub use errors::EncodeError;
pub use profile::{Profile, ProfileKind, ResponseFraming, Separator};
pub use request::{Request, RequestKind};
pub use response::{
    DecodeContext, HistoryLine, MessageRecord, Response, decode, decode_incoming, split_records,
};
