//! Simulated chat server for turmoil.
//!
//! `ChatServer` is a small in-memory implementation of the server side of
//! both dialects. It keeps accounts, contact lists and a message log, and
//! pushes each new message to the recipient's open connections as a
//! `sender|receiver|body` line.
//!
//! It exists to give client tests a realistic peer, not to specify the
//! server: replies follow what the client must understand.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex, PoisonError},
};

use linechat_proto::{ProfileKind, Separator};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, WriteHalf},
    sync::Mutex as AsyncMutex,
};
use turmoil::net::{TcpListener, TcpStream};

type Writer = Arc<AsyncMutex<WriteHalf<TcpStream>>>;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    contacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Stored {
    sender: String,
    receiver: String,
    body: String,
}

#[derive(Default)]
struct World {
    accounts: HashMap<String, Account>,
    log: Vec<Stored>,
    /// Open connections per logged-in user, for pushes.
    online: HashMap<String, Vec<Writer>>,
}

/// In-memory chat server speaking one dialect.
#[derive(Clone)]
pub struct ChatServer {
    dialect: ProfileKind,
    separator: Separator,
    world: Arc<Mutex<World>>,
}

impl ChatServer {
    /// Empty server for `dialect`, separating records with its default
    /// separator.
    pub fn new(dialect: ProfileKind) -> Self {
        Self { dialect, separator: dialect.default_separator(), world: Arc::default() }
    }

    /// Use `separator` between records of list replies.
    #[must_use]
    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// Register an account with its contact list.
    #[must_use]
    pub fn with_account(self, username: &str, password: &str, contacts: &[&str]) -> Self {
        let account = Account {
            password: password.to_owned(),
            contacts: contacts.iter().map(|c| (*c).to_owned()).collect(),
        };
        lock(&self.world).accounts.insert(username.to_owned(), account);
        self
    }

    /// Seed the message log.
    #[must_use]
    pub fn with_message(self, sender: &str, receiver: &str, body: &str) -> Self {
        lock(&self.world).log.push(Stored {
            sender: sender.to_owned(),
            receiver: receiver.to_owned(),
            body: body.to_owned(),
        });
        self
    }

    /// Messages stored so far, as `(sender, receiver, body)`.
    pub fn messages(&self) -> Vec<(String, String, String)> {
        lock(&self.world)
            .log
            .iter()
            .map(|m| (m.sender.clone(), m.receiver.clone(), m.body.clone()))
            .collect()
    }

    /// Bind `address` and serve connections until the simulation ends.
    pub async fn serve(self, address: &str) -> io::Result<()> {
        let listener = TcpListener::bind(address).await?;
        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::debug!(%peer, "sim server accepted connection");
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    tracing::debug!(%peer, error = %e, "sim connection ended");
                }
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream) -> io::Result<()> {
        let (read_half, write_half) = tokio::io::split(stream);
        let writer: Writer = Arc::new(AsyncMutex::new(write_half));
        let mut lines = BufReader::new(read_half).lines();
        let mut user: Option<String> = None;

        while let Some(line) = lines.next_line().await? {
            let (reply, push) = self.respond(&line, &mut user, &writer);
            write_lines(&writer, &reply).await?;

            if let Some((receiver, record)) = push {
                let targets = lock(&self.world).online.get(&receiver).cloned().unwrap_or_default();
                for target in targets {
                    if !Arc::ptr_eq(&target, &writer) {
                        // The recipient may have gone away; pushes are best effort.
                        let _ = write_lines(&target, std::slice::from_ref(&record)).await;
                    }
                }
            }
        }

        if let Some(user) = user
            && let Some(conns) = lock(&self.world).online.get_mut(&user)
        {
            conns.retain(|w| !Arc::ptr_eq(w, &writer));
        }
        Ok(())
    }

    /// Compute reply lines and an optional push `(receiver, line)`.
    fn respond(
        &self,
        line: &str,
        user: &mut Option<String>,
        writer: &Writer,
    ) -> (Vec<String>, Option<(String, String)>) {
        let tokens: Vec<&str> = line.split(' ').collect();
        let request = match self.dialect {
            ProfileKind::HostPrefixed => parse_host_prefixed(&tokens),
            ProfileKind::IdentityFirst => parse_identity_first(&tokens),
        };
        let Some(request) = request else {
            return (vec!["Invalid request".to_owned()], None);
        };

        let mut world = lock(&self.world);
        match request {
            Parsed::Login { username, password } => {
                let accepted = world.accounts.get(&username).is_some_and(|account| {
                    password.as_deref().is_none_or(|p| p == account.password)
                });
                if !accepted {
                    return (vec!["Sorry, invalid credentials".to_owned()], None);
                }
                world.online.entry(username.clone()).or_default().push(Arc::clone(writer));
                let token = format!("{username}-session");
                *user = Some(username);
                (vec![token], None)
            },
            Parsed::Contacts { username } => {
                let Some(me) = username.or_else(|| user.clone()) else {
                    return (vec!["Invalid token".to_owned()], None);
                };
                let contacts = world.accounts.get(&me).map(|a| a.contacts.clone()).unwrap_or_default();
                let entries: Vec<String> = match self.dialect {
                    ProfileKind::HostPrefixed => {
                        contacts.iter().enumerate().map(|(i, c)| format!("{}. {c}", i + 1)).collect()
                    },
                    ProfileKind::IdentityFirst => contacts,
                };
                (self.frame(entries), None)
            },
            Parsed::History { username, contact } => {
                let Some(me) = username.or_else(|| user.clone()) else {
                    return (vec!["Invalid token".to_owned()], None);
                };
                let entries = world
                    .log
                    .iter()
                    .filter(|m| {
                        let mine = m.sender == me || m.receiver == me;
                        let with = contact
                            .as_ref()
                            .is_none_or(|c| m.sender == *c || m.receiver == *c);
                        mine && with
                    })
                    .map(|m| format!("{}|{}|{}", m.sender, m.receiver, m.body))
                    .collect();
                (self.frame(entries), None)
            },
            Parsed::Send { sender, receiver, body } => {
                let Some(sender) = sender.or_else(|| user.clone()) else {
                    return (vec!["Invalid token".to_owned()], None);
                };
                let record = format!("{sender}|{receiver}|{body}");
                world.log.push(Stored { sender, receiver: receiver.clone(), body });
                (vec!["OK".to_owned()], Some((receiver, record)))
            },
        }
    }

    /// Lay out list entries according to the separator.
    fn frame(&self, entries: Vec<String>) -> Vec<String> {
        match self.separator.literal() {
            Some(sep) => vec![entries.iter().map(|e| format!("{e}{sep}")).collect()],
            None if entries.is_empty() => vec![String::new()],
            None => entries,
        }
    }
}

enum Parsed {
    Login { username: String, password: Option<String> },
    Contacts { username: Option<String> },
    History { username: Option<String>, contact: Option<String> },
    Send { sender: Option<String>, receiver: String, body: String },
}

/// `<host> <port> <opcode> <arg> [args...]`
fn parse_host_prefixed(tokens: &[&str]) -> Option<Parsed> {
    let [_host, _port, opcode, rest @ ..] = tokens else {
        return None;
    };
    match (*opcode, rest) {
        ("1", [username]) => Some(Parsed::Login { username: (*username).to_owned(), password: None }),
        ("2", [_token]) => Some(Parsed::Contacts { username: None }),
        ("4", [_token, ..]) => Some(Parsed::History { username: None, contact: None }),
        ("3", [_token, receiver, body @ ..]) if !body.is_empty() => Some(Parsed::Send {
            sender: None,
            receiver: (*receiver).to_owned(),
            body: body.join(" "),
        }),
        _ => None,
    }
}

/// `<username> [args...] <opcode>`
fn parse_identity_first(tokens: &[&str]) -> Option<Parsed> {
    let [head @ .., opcode] = tokens else {
        return None;
    };
    match (*opcode, head) {
        ("1", [username, password]) => Some(Parsed::Login {
            username: (*username).to_owned(),
            password: Some((*password).to_owned()),
        }),
        ("4", [username]) => Some(Parsed::Contacts { username: Some((*username).to_owned()) }),
        ("2", [username, contact]) => Some(Parsed::History {
            username: Some((*username).to_owned()),
            contact: Some((*contact).to_owned()),
        }),
        ("3", [sender, receiver, body @ ..]) if !body.is_empty() => Some(Parsed::Send {
            sender: Some((*sender).to_owned()),
            receiver: (*receiver).to_owned(),
            body: body.join(" "),
        }),
        _ => None,
    }
}

async fn write_lines(writer: &Writer, lines: &[String]) -> io::Result<()> {
    let mut writer = writer.lock().await;
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
