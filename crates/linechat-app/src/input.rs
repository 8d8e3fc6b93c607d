//! Front-end agnostic user input.

/// One user command.
///
/// Decouples application logic from how the front-end collects input
/// (terminal lines, a GUI form, a simulation script).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// `/login <username> [password]`
    Login {
        /// Account name.
        username: String,
        /// Password, if given.
        password: Option<String>,
    },
    /// `/contacts`
    RefreshContacts,
    /// `/select <contact>`
    Select(String),
    /// `/history`
    ReloadHistory,
    /// Any line that is not a command: a message for the open conversation.
    Send(String),
    /// `/logout`
    Logout,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Unrecognised or malformed command, verbatim.
    Unknown(String),
}

impl UserInput {
    /// Parse one line of text input. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Send(line.to_owned()));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let input = match (name, args.as_slice()) {
            ("login", [username]) => {
                Self::Login { username: (*username).to_owned(), password: None }
            },
            ("login", [username, password]) => Self::Login {
                username: (*username).to_owned(),
                password: Some((*password).to_owned()),
            },
            ("contacts", []) => Self::RefreshContacts,
            ("select" | "open", [contact]) => Self::Select((*contact).to_owned()),
            ("history", []) => Self::ReloadHistory,
            ("logout", []) => Self::Logout,
            ("help", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => Self::Unknown(line.to_owned()),
        };
        Some(input)
    }
}
