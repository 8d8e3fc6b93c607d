//! Property-based tests for the line codec.
//!
//! Decoding is lossy (ordinals, whitespace and reserved record fields are
//! dropped), so these tests check determinism and decoding invariants rather
//! than round trips.

use linechat_proto::{
    DecodeContext, EncodeError, Profile, Request, RequestKind, Response, Separator, decode,
};
use proptest::prelude::*;

/// Names that are valid single wire tokens.
fn arbitrary_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

/// Free text without line breaks or record separators.
fn arbitrary_body() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 ,.!?]{0,40}"
}

fn arbitrary_profile() -> impl Strategy<Value = Profile> {
    prop_oneof![
        (arbitrary_name(), any::<u16>()).prop_map(|(host, port)| Profile::host_prefixed(host, port)),
        Just(Profile::identity_first()),
    ]
}

fn arbitrary_token() -> impl Strategy<Value = Option<String>> {
    arbitrary_name().prop_map(Some)
}

fn arbitrary_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        (arbitrary_name(), arbitrary_name())
            .prop_map(|(username, password)| Request::Login { username, password: Some(password) }),
        (arbitrary_name(), arbitrary_token())
            .prop_map(|(username, token)| Request::ListContacts { username, token }),
        (arbitrary_name(), arbitrary_token(), arbitrary_name()).prop_map(|(username, token, contact)| {
            Request::ListMessages { username, token, contact }
        }),
        (arbitrary_name(), arbitrary_token(), arbitrary_name(), arbitrary_body()).prop_map(
            |(sender, token, receiver, body)| Request::SendMessage { sender, token, receiver, body }
        ),
    ]
}

fn arbitrary_separator() -> impl Strategy<Value = Separator> {
    prop_oneof![Just(Separator::EscapedNewline), Just(Separator::SlashN), Just(Separator::Newline)]
}

fn join(entries: &[String], separator: Separator) -> String {
    let sep = separator.literal().unwrap_or("\n");
    entries.iter().map(|e| format!("{e}{sep}")).collect()
}

proptest! {
    #[test]
    fn prop_encode_is_deterministic(request in arbitrary_request(), profile in arbitrary_profile()) {
        let first = request.encode(&profile);
        let second = request.encode(&profile);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_encoded_line_is_single_line(request in arbitrary_request(), profile in arbitrary_profile()) {
        let line = request.encode(&profile).unwrap();
        prop_assert!(!line.contains('\n'));
        prop_assert!(!line.contains('\r'));
    }

    #[test]
    fn prop_opcode_position_matches_profile(request in arbitrary_request(), profile in arbitrary_profile()) {
        let line = request.encode(&profile).unwrap();
        let opcode = profile.opcode(request.kind()).to_string();
        let tokens: Vec<&str> = line.split(' ').collect();
        match profile {
            Profile::HostPrefixed { .. } => prop_assert_eq!(tokens[2], opcode.as_str()),
            Profile::IdentityFirst { .. } => prop_assert_eq!(*tokens.last().unwrap(), opcode.as_str()),
        }
    }

    #[test]
    fn prop_line_breaks_never_reach_the_wire(
        profile in arbitrary_profile(),
        head in arbitrary_body(),
        tail in arbitrary_body(),
    ) {
        let request = Request::SendMessage {
            sender: "alice".into(),
            token: Some("t".into()),
            receiver: "bob".into(),
            body: format!("{head}\n{tail}"),
        };
        prop_assert_eq!(request.encode(&profile), Err(EncodeError::LineBreak("body")));
    }

    #[test]
    fn prop_contacts_preserve_order(
        names in prop::collection::vec(arbitrary_name(), 0..20),
        separator in arbitrary_separator(),
        numbered in any::<bool>(),
    ) {
        let entries: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, n)| if numbered { format!("{}. {n}", i + 1) } else { n.clone() })
            .collect();
        let text = join(&entries, separator);
        let ctx = DecodeContext { separator, self_username: "me" };

        prop_assert_eq!(decode(RequestKind::ListContacts, &text, &ctx), Response::ContactList(names));
    }

    #[test]
    fn prop_history_attribution(
        records in prop::collection::vec((arbitrary_name(), arbitrary_body()), 0..20),
        separator in arbitrary_separator(),
    ) {
        let me = records.first().map(|(s, _)| s.clone()).unwrap_or_default();
        let entries: Vec<String> = records.iter().map(|(s, b)| format!("{s}|x|{b}")).collect();
        let text = join(&entries, separator);
        let ctx = DecodeContext { separator, self_username: &me };

        let Response::MessageList(lines) = decode(RequestKind::ListMessages, &text, &ctx) else {
            return Err(TestCaseError::fail("expected message list"));
        };
        prop_assert_eq!(lines.len(), records.len());
        for (line, (sender, body)) in lines.iter().zip(&records) {
            let prefix = if *sender == me { "[You]".to_string() } else { format!("[{sender}]") };
            prop_assert_eq!(line.display(&me), format!("{prefix}: {}", body.trim()));
        }
    }

    #[test]
    fn prop_decode_never_drops_text(text in "\\PC{0,80}", kind in prop_oneof![
        Just(RequestKind::Login),
        Just(RequestKind::ListContacts),
        Just(RequestKind::ListMessages),
        Just(RequestKind::SendMessage),
    ]) {
        let ctx = DecodeContext { separator: Separator::EscapedNewline, self_username: "me" };
        match decode(kind, &text, &ctx) {
            Response::Raw(raw) | Response::Failure(raw) => prop_assert_eq!(raw, text),
            Response::Token(_) | Response::ContactList(_) | Response::MessageList(_) | Response::Ack => {},
        }
    }
}
