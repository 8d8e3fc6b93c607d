//! Client
//!
//! Connection and session layer for the linechat line protocol. Owns the TCP
//! socket, enforces the half-duplex request/reply discipline, and keeps the
//! post-login session state (identity, contacts, selected conversation).
//!
//! # Components
//!
//! - [`LineTransport`]: send/receive/close primitives over one connection
//! - [`LineConnection`]: [`LineTransport`] over any async byte stream (TCP in
//!   production, simulated streams in tests)
//! - [`Link`]: single-request-in-flight discipline shared with the listener
//! - [`Session`]: login, contacts, history and send operations
//! - [`listener`]: background loop delivering unsolicited messages
//!
//! # Concurrency
//!
//! The wire has no request identifiers: responses are matched to requests
//! purely by arrival order. [`Link::exchange`] therefore holds the stream for
//! the whole send/receive pair, and a running listener is preempted while an
//! exchange is pending. A line pushed by the server while an exchange waits
//! for its reply is indistinguishable from that reply; the format offers no
//! way to tell them apart.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod connection;
mod error;
mod link;
pub mod listener;
mod session;

pub use config::{ConnectionConfig, SessionConfig};
pub use connection::{Connector, LineConnection, LineTransport, TcpConnector};
pub use error::{ClientError, ErrorKind};
pub use link::Link;
pub use linechat_proto::{MessageRecord, Profile, ProfileKind, Separator};
pub use listener::{Incoming, ListenerExit, ListenerHandle};
pub use session::{Identity, Session};
