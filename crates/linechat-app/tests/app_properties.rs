//! Property-based tests for App state machine.
//!
//! Tests verify that invariants hold under arbitrary event and input
//! sequences, not specific scenarios.

use linechat_app::{App, AppAction, AppEvent, ConnectionState, UserInput};
use linechat_client::{ErrorKind, Incoming, MessageRecord};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    prop_oneof![Just("alice".to_owned()), Just("bob".to_owned()), Just("carol".to_owned())]
}

fn kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::Connect),
        Just(ErrorKind::Io),
        Just(ErrorKind::Protocol),
        Just(ErrorKind::State),
        Just(ErrorKind::Failure),
    ]
}

/// Generate random bridge events.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        1 => Just(AppEvent::Connecting),
        2 => name().prop_map(|username| AppEvent::LoggedIn { username }),
        1 => (kind(), "[a-z ]{0,12}").prop_map(|(kind, reason)| AppEvent::LoginFailed { kind, reason }),
        2 => prop::collection::vec(name(), 0..3).prop_map(AppEvent::ContactsUpdated),
        2 => (name(), prop::collection::vec("[a-z ]{1,8}", 0..3))
            .prop_map(|(contact, lines)| AppEvent::HistoryLoaded { contact, lines }),
        1 => "[a-z]{1,8}".prop_map(|body| AppEvent::MessageSent { echo: format!("[You]: {body}") }),
        1 => (name(), "[a-z]{1,8}").prop_map(|(sender, body)| {
            AppEvent::MessageReceived(Incoming::Message(MessageRecord {
                sender,
                receiver: "alice".into(),
                body,
            }))
        }),
        1 => proptest::option::of("[a-z ]{1,12}").prop_map(|reason| AppEvent::Disconnected { reason }),
        1 => (proptest::option::of(kind()), "[a-z ]{1,12}")
            .prop_map(|(kind, message)| AppEvent::Failed { kind, message }),
    ]
}

/// Generate random user commands.
fn input_strategy() -> impl Strategy<Value = UserInput> {
    prop_oneof![
        (name(), proptest::option::of("[a-z0-9]{1,8}"))
            .prop_map(|(username, password)| UserInput::Login { username, password }),
        Just(UserInput::RefreshContacts),
        name().prop_map(UserInput::Select),
        Just(UserInput::ReloadHistory),
        "[a-z ]{0,10}".prop_map(UserInput::Send),
        Just(UserInput::Logout),
        Just(UserInput::Help),
    ]
}

#[derive(Debug, Clone)]
enum Step {
    Event(AppEvent),
    Input(UserInput),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![event_strategy().prop_map(Step::Event), input_strategy().prop_map(Step::Input)]
}

proptest! {
    #[test]
    fn prop_every_step_renders(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut app = App::new("localhost:5000".into());
        for step in steps {
            let actions = match step {
                Step::Event(event) => app.handle(event),
                Step::Input(input) => app.apply(input),
            };
            prop_assert_eq!(actions.last(), Some(&AppAction::Render));
        }
    }

    #[test]
    fn prop_disconnect_clears_session_view(
        before in prop::collection::vec(event_strategy(), 0..40),
        reason in proptest::option::of("[a-z ]{1,12}"),
    ) {
        let mut app = App::new("localhost:5000".into());
        for event in before {
            let _ = app.handle(event);
        }
        let _ = app.handle(AppEvent::Disconnected { reason });

        prop_assert_eq!(app.connection_state(), &ConnectionState::Disconnected);
        prop_assert!(app.contacts().is_empty());
        prop_assert!(app.conversation().is_none());
    }

    #[test]
    fn prop_session_actions_respect_state(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut app = App::new("localhost:5000".into());
        for step in steps {
            let logged_in = matches!(app.connection_state(), ConnectionState::LoggedIn { .. });
            let has_conversation = app.conversation().is_some();
            let contacts = app.contacts().to_vec();

            let actions = match step {
                Step::Event(event) => app.handle(event),
                Step::Input(input) => app.apply(input),
            };

            for action in actions {
                match action {
                    AppAction::SendMessage { body } => {
                        prop_assert!(logged_in && has_conversation);
                        prop_assert!(!body.trim().is_empty());
                    },
                    AppAction::SelectContact { contact } => {
                        prop_assert!(logged_in);
                        prop_assert!(contacts.contains(&contact));
                    },
                    AppAction::LoadHistory => prop_assert!(logged_in),
                    AppAction::Render
                    | AppAction::Quit
                    | AppAction::Login { .. }
                    | AppAction::ListContacts
                    | AppAction::Logout => {},
                }
            }
        }
    }

    #[test]
    fn prop_conversation_only_grows_by_appends(
        contact in name(),
        history in prop::collection::vec("[a-z ]{1,8}", 0..5),
        events in prop::collection::vec(event_strategy(), 0..30),
    ) {
        let mut app = App::new("localhost:5000".into());
        let _ = app.handle(AppEvent::LoggedIn { username: "alice".into() });
        let _ = app.handle(AppEvent::HistoryLoaded { contact: contact.clone(), lines: history });

        for event in events {
            let before = app.conversation().cloned();
            let replaced = matches!(
                event,
                AppEvent::HistoryLoaded { .. } | AppEvent::Disconnected { .. } | AppEvent::ContactsUpdated(_)
            );
            let _ = app.handle(event);

            if let (Some(before), Some(after), false) = (before, app.conversation(), replaced) {
                prop_assert_eq!(&before.contact, &after.contact);
                prop_assert!(after.lines.starts_with(&before.lines));
            }
        }
    }
}
