//! Fuzz target for response decoding
//!
//! # Strategy
//!
//! - Arbitrary text decoded as every request kind
//! - Every separator, including ones the server did not use
//! - The same text as an unsolicited push
//!
//! # Invariants
//!
//! - Decoding never panics: every input maps to some response
//! - Contact names are non-empty and free of whitespace
//! - History never contains blank entries
//! - A parsed push record has no `|` in its sender

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use linechat_proto::{
    decode, decode_incoming, DecodeContext, RequestKind, Response, Separator,
};

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    username: String,
    separator: u8,
}

const KINDS: [RequestKind; 4] = [
    RequestKind::Login,
    RequestKind::ListContacts,
    RequestKind::ListMessages,
    RequestKind::SendMessage,
];

fuzz_target!(|input: Input| {
    let separator = match input.separator % 3 {
        0 => Separator::EscapedNewline,
        1 => Separator::SlashN,
        _ => Separator::Newline,
    };
    let ctx = DecodeContext { separator, self_username: &input.username };

    for kind in KINDS {
        match decode(kind, &input.text, &ctx) {
            Response::ContactList(contacts) => {
                for name in contacts {
                    assert!(!name.is_empty());
                    assert!(!name.chars().any(char::is_whitespace));
                }
            }
            Response::MessageList(lines) => {
                for line in lines {
                    assert!(!line.display(&input.username).trim().is_empty());
                }
            }
            Response::Token(token) => assert!(!token.is_empty()),
            Response::Ack | Response::Failure(_) | Response::Raw(_) => {}
        }
    }

    if let Some(record) = decode_incoming(&input.text) {
        assert!(!record.sender.contains('|'));
        let _ = record.display(&input.username);
    }
});
