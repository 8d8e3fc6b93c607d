//! Fuzz target for request encoding
//!
//! # Strategy
//!
//! - Arbitrary field values for every request in both dialects
//! - Hosts, tokens and usernames with spaces, line breaks and padding
//!
//! # Invariants
//!
//! - Encoding either fails or yields exactly one line
//! - Encoding is deterministic
//! - Single-token fields never shift the argument positions: a successful
//!   encoding always carries the opcode where the dialect expects it

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use linechat_proto::{Profile, Request, Separator};

#[derive(Debug, Arbitrary)]
struct Input {
    host: String,
    port: u16,
    identity_first: bool,
    request: Fields,
}

#[derive(Debug, Arbitrary)]
enum Fields {
    Login { username: String, password: Option<String> },
    ListContacts { username: String, token: Option<String> },
    ListMessages { username: String, token: Option<String>, contact: String },
    SendMessage { sender: String, token: Option<String>, receiver: String, body: String },
}

fuzz_target!(|input: Input| {
    let profile = if input.identity_first {
        Profile::IdentityFirst { separator: Separator::Newline }
    } else {
        Profile::HostPrefixed {
            host: input.host.clone(),
            port: input.port,
            separator: Separator::EscapedNewline,
        }
    };

    let request = match input.request {
        Fields::Login { username, password } => Request::Login { username, password },
        Fields::ListContacts { username, token } => Request::ListContacts { username, token },
        Fields::ListMessages { username, token, contact } => {
            Request::ListMessages { username, token, contact }
        }
        Fields::SendMessage { sender, token, receiver, body } => {
            Request::SendMessage { sender, token, receiver, body }
        }
    };

    let Ok(line) = request.encode(&profile) else {
        return;
    };
    assert!(!line.contains(['\n', '\r']));
    assert_eq!(request.encode(&profile).ok().as_deref(), Some(line.as_str()));

    let opcode = profile.kind().opcode(request.kind()).to_string();
    let tokens: Vec<&str> = line.split(' ').collect();
    if input.identity_first {
        assert_eq!(tokens.last(), Some(&opcode.as_str()));
    } else {
        assert_eq!(tokens.get(2), Some(&opcode.as_str()));
    }
});
