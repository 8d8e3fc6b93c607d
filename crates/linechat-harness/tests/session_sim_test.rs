//! End-to-end session flows against the simulated chat server.

use std::time::Duration;

use linechat_client::{
    ClientError, Incoming, MessageRecord, ProfileKind, Separator, Session, SessionConfig,
};
use linechat_harness::{ChatServer, SimConnector};
use tokio::sync::mpsc;

const PORT: u16 = 5000;

/// Fixed latency, so burst replies always land inside the grace period.
fn simulation() -> turmoil::Sim<'static> {
    turmoil::Builder::new()
        .min_message_latency(Duration::from_millis(1))
        .max_message_latency(Duration::from_millis(1))
        .build()
}

fn serve(sim: &mut turmoil::Sim<'static>, server: &ChatServer) {
    let server = server.clone();
    sim.host("server", move || {
        let server = server.clone();
        async move {
            server.serve("0.0.0.0:5000").await?;
            Ok(())
        }
    });
}

fn new_session(profile: ProfileKind, separator: Option<Separator>) -> Session<SimConnector> {
    let config = SessionConfig { profile, separator, ..SessionConfig::default() };
    Session::new(SimConnector::new(config.connection.clone()), config)
}

#[test]
fn host_prefixed_session() {
    let server = ChatServer::new(ProfileKind::HostPrefixed)
        .with_account("alice", "unused", &["bob", "carol"])
        .with_message("bob", "alice", "hi alice")
        .with_message("alice", "bob", "hey bob");
    let mut sim = simulation();
    serve(&mut sim, &server);

    let observed = server.clone();
    sim.client("alice", async move {
        let mut session = new_session(ProfileKind::HostPrefixed, None);

        let identity = session.login("server", PORT, "alice", None).await?;
        assert_eq!(identity.token.as_deref(), Some("alice-session"));

        assert_eq!(session.list_contacts().await?, vec!["bob", "carol"]);
        session.select_contact("bob")?;
        assert_eq!(session.load_history().await?, vec!["[bob]: hi alice", "[You]: hey bob"]);
        assert_eq!(session.send_chat("lunch?").await?, "[You]: lunch?");

        session.logout().await;
        assert!(!session.is_logged_in());

        let last = observed.messages().pop();
        assert_eq!(last, Some(("alice".into(), "bob".into(), "lunch?".into())));
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn identity_first_session_reads_multi_line_replies() {
    let server = ChatServer::new(ProfileKind::IdentityFirst)
        .with_account("alice", "secret", &["bob", "carol", "dave"])
        .with_message("bob", "alice", "one")
        .with_message("alice", "bob", "two")
        .with_message("carol", "alice", "elsewhere")
        .with_message("bob", "alice", "three");
    let mut sim = simulation();
    serve(&mut sim, &server);

    sim.client("alice", async {
        let mut session = new_session(ProfileKind::IdentityFirst, None);

        session.login("server", PORT, "alice", Some("secret")).await?;
        assert_eq!(session.list_contacts().await?, vec!["bob", "carol", "dave"]);
        session.select_contact("bob")?;
        assert_eq!(
            session.load_history().await?,
            vec!["[bob]: one", "[You]: two", "[bob]: three"]
        );

        // A contact without history answers with one empty line.
        session.select_contact("dave")?;
        assert!(session.load_history().await?.is_empty());
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn identity_first_with_literal_separator() {
    let server = ChatServer::new(ProfileKind::IdentityFirst)
        .with_separator(Separator::SlashN)
        .with_account("alice", "secret", &["bob", "carol"]);
    let mut sim = simulation();
    serve(&mut sim, &server);

    sim.client("alice", async {
        let mut session = new_session(ProfileKind::IdentityFirst, Some(Separator::SlashN));

        session.login("server", PORT, "alice", Some("secret")).await?;
        assert_eq!(session.list_contacts().await?, vec!["bob", "carol"]);
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn wrong_password_is_rejected() {
    let server =
        ChatServer::new(ProfileKind::IdentityFirst).with_account("alice", "secret", &["bob"]);
    let mut sim = simulation();
    serve(&mut sim, &server);

    sim.client("alice", async {
        let mut session = new_session(ProfileKind::IdentityFirst, None);

        let err = session.login("server", PORT, "alice", Some("guess")).await.unwrap_err();
        assert_eq!(err, ClientError::Rejected("Sorry, invalid credentials".into()));
        assert!(!session.is_logged_in());
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn listener_receives_pushed_messages() {
    let server = ChatServer::new(ProfileKind::IdentityFirst)
        .with_account("alice", "a", &["bob"])
        .with_account("bob", "b", &["alice"]);
    let mut sim = simulation();
    serve(&mut sim, &server);

    sim.client("bob", async {
        let mut session = new_session(ProfileKind::IdentityFirst, None);
        session.login("server", PORT, "bob", Some("b")).await?;
        session.list_contacts().await?;
        session.select_contact("alice")?;

        let (sink, mut incoming) = mpsc::unbounded_channel();
        let handle = session.listen(sink)?;

        let pushed = tokio::time::timeout(Duration::from_secs(5), incoming.recv()).await?;
        let expected =
            MessageRecord { sender: "alice".into(), receiver: "bob".into(), body: "ping".into() };
        assert_eq!(pushed, Some(Incoming::Message(expected)));

        // Requests still work while the listener runs.
        assert_eq!(session.send_chat("pong").await?, "[You]: pong");

        session.logout().await;
        handle.join().await;
        Ok(())
    });

    sim.client("alice", async {
        // Give bob time to log in and start listening.
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut session = new_session(ProfileKind::IdentityFirst, None);
        session.login("server", PORT, "alice", Some("a")).await?;
        session.list_contacts().await?;
        session.select_contact("bob")?;
        session.send_chat("ping").await?;
        session.logout().await;
        Ok(())
    });

    sim.run().expect("simulation failed");
}
