//! Console driver.
//!
//! Implements the [`Driver`] trait over a line-based reader and writer. Each
//! render prints only what changed since the previous one, so the output
//! reads as a running chat transcript instead of repeated screens.

use std::io::{self, Write};

use linechat_app::{App, Driver, UserInput};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Console driver errors.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Reading input or writing output failed.
    #[error("console I/O error: {0}")]
    Io(#[from] io::Error),
}

/// What the transcript already shows.
#[derive(Debug, Default)]
struct Shown {
    status: Option<String>,
    contacts: Vec<String>,
    contact: Option<String>,
    lines: usize,
}

/// Console driver implementing the [`Driver`] trait.
pub struct ConsoleDriver<R, W> {
    input: Lines<R>,
    output: W,
    shown: Shown,
}

impl<R, W> ConsoleDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Read commands from `input`, print to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input: input.lines(), output, shown: Shown::default() }
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.output
    }
}

impl<R, W> Driver for ConsoleDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = ConsoleError;

    async fn poll_input(&mut self) -> Result<Option<UserInput>, Self::Error> {
        // `next_line` is cancel-safe: a dropped call loses no input.
        while let Some(line) = self.input.next_line().await? {
            if let Some(input) = UserInput::parse(&line) {
                return Ok(Some(input));
            }
        }
        Ok(None)
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let out = &mut self.output;
        let shown = &mut self.shown;

        if app.contacts() != shown.contacts.as_slice() {
            if !app.contacts().is_empty() {
                writeln!(out, "Contacts: {}", app.contacts().join(", "))?;
            }
            shown.contacts = app.contacts().to_vec();
        }

        match app.conversation() {
            Some(conversation) => {
                let switched = shown.contact.as_deref() != Some(conversation.contact.as_str());
                if switched || conversation.lines.len() < shown.lines {
                    writeln!(out, "--- {} ---", conversation.contact)?;
                    shown.contact = Some(conversation.contact.clone());
                    shown.lines = 0;
                }
                for line in conversation.lines.iter().skip(shown.lines) {
                    writeln!(out, "{line}")?;
                }
                shown.lines = conversation.lines.len();
            },
            None => {
                shown.contact = None;
                shown.lines = 0;
            },
        }

        let status = app.status_message();
        if status != shown.status.as_deref() {
            if let Some(status) = status {
                writeln!(out, "* {status}")?;
            }
            shown.status = status.map(str::to_owned);
        }

        out.flush()?;
        Ok(())
    }

    fn stop(&mut self) {
        if let Err(e) = self.output.flush() {
            tracing::debug!(error = %e, "failed to flush console output");
        }
    }
}

#[cfg(test)]
mod tests {
    use linechat_app::AppEvent;
    use linechat_client::{Incoming, MessageRecord};

    use super::*;

    fn driver(input: &'static str) -> ConsoleDriver<&'static [u8], Vec<u8>> {
        ConsoleDriver::new(input.as_bytes(), Vec::new())
    }

    fn transcript(driver: &ConsoleDriver<&'static [u8], Vec<u8>>) -> String {
        String::from_utf8_lossy(driver.output()).into_owned()
    }

    #[tokio::test]
    async fn reads_commands_and_skips_blank_lines() {
        let mut console = driver("/login alice\n\n   \nhello there\n/quit\n");

        assert_eq!(
            console.poll_input().await.unwrap(),
            Some(UserInput::Login { username: "alice".into(), password: None })
        );
        assert_eq!(console.poll_input().await.unwrap(), Some(UserInput::Send("hello there".into())));
        assert_eq!(console.poll_input().await.unwrap(), Some(UserInput::Quit));
        assert_eq!(console.poll_input().await.unwrap(), None);
    }

    #[test]
    fn prints_only_what_changed() {
        let mut console = driver("");
        let mut app = App::new("localhost:5000".into());

        for event in [
            AppEvent::Connecting,
            AppEvent::LoggedIn { username: "alice".into() },
            AppEvent::ContactsUpdated(vec!["bob".into(), "carol".into()]),
            AppEvent::HistoryLoaded { contact: "bob".into(), lines: vec!["[bob]: hi".into()] },
            AppEvent::MessageSent { echo: "[You]: hello".into() },
            AppEvent::MessageReceived(Incoming::Message(MessageRecord {
                sender: "bob".into(),
                receiver: "alice".into(),
                body: "how are you?".into(),
            })),
            AppEvent::HistoryLoaded { contact: "carol".into(), lines: vec![] },
            AppEvent::Disconnected { reason: Some("server closed the connection".into()) },
        ] {
            let _ = app.handle(event);
            console.render(&app).unwrap();
            // Rendering an unchanged state prints nothing.
            console.render(&app).unwrap();
        }

        insta::assert_snapshot!(transcript(&console), @r"
        * Connecting to localhost:5000...
        * Logged in as alice
        Contacts: bob, carol
        --- bob ---
        [bob]: hi
        [You]: hello
        [bob]: how are you?
        --- carol ---
        * Disconnected: server closed the connection
        ");
    }
}
