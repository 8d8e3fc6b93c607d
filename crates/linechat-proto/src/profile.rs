//! Encoding profiles.
//!
//! A profile fixes three things for the lifetime of a session: the order of
//! fields in a request line, the opcode numbering, and how multi-record
//! responses are delimited and framed. Profiles are chosen once at session
//! start and never inferred per call.

use std::{fmt, str::FromStr};

use crate::RequestKind;

/// In-band separator between records of a multi-record response.
///
/// The two historical clients disagree here. The host-prefixed server emits
/// an escaped two-character sequence instead of a real line break, while the
/// identity-first server sends genuine line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// The two characters `\` and `n`.
    EscapedNewline,
    /// The two characters `/` and `n`.
    SlashN,
    /// A real line break.
    Newline,
}

impl Separator {
    /// Literal token to split on, in addition to real line breaks.
    ///
    /// `None` for [`Separator::Newline`]: real line breaks are always split.
    pub fn literal(self) -> Option<&'static str> {
        match self {
            Self::EscapedNewline => Some("\\n"),
            Self::SlashN => Some("/n"),
            Self::Newline => None,
        }
    }
}

impl FromStr for Separator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "escaped" => Ok(Self::EscapedNewline),
            "slash" => Ok(Self::SlashN),
            "newline" => Ok(Self::Newline),
            other => Err(format!("unknown separator `{other}` (expected escaped, slash or newline)")),
        }
    }
}

/// How many wire lines make up one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFraming {
    /// Exactly one line per response.
    SingleLine,
    /// The first line plus every line that follows within a short grace
    /// period. Needed when records are separated by real line breaks.
    Burst,
}

/// Dialect selector without addressing data, used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// `<host> <port> <opcode> <token> [args...]`
    HostPrefixed,
    /// `<username> [args...] <opcode>`
    IdentityFirst,
}

impl ProfileKind {
    /// Separator the dialect's server emits by default.
    pub fn default_separator(self) -> Separator {
        match self {
            Self::HostPrefixed => Separator::EscapedNewline,
            Self::IdentityFirst => Separator::Newline,
        }
    }

    /// Wire opcode for a request kind.
    ///
    /// The dialects share login (1) and send (3) but swap the numbers for
    /// contact listing and message history.
    pub fn opcode(self, kind: RequestKind) -> u8 {
        match (self, kind) {
            (_, RequestKind::Login) => 1,
            (_, RequestKind::SendMessage) => 3,
            (Self::HostPrefixed, RequestKind::ListContacts)
            | (Self::IdentityFirst, RequestKind::ListMessages) => 2,
            (Self::HostPrefixed, RequestKind::ListMessages)
            | (Self::IdentityFirst, RequestKind::ListContacts) => 4,
        }
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host-prefixed" | "a" => Ok(Self::HostPrefixed),
            "identity-first" | "b" => Ok(Self::IdentityFirst),
            other => Err(format!(
                "unknown profile `{other}` (expected host-prefixed or identity-first)"
            )),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostPrefixed => f.write_str("host-prefixed"),
            Self::IdentityFirst => f.write_str("identity-first"),
        }
    }
}

/// Complete encoding profile.
///
/// # Invariants
///
/// - A session uses exactly one profile from login to logout.
/// - [`Profile::HostPrefixed`] addresses every request with the same
///   `host port` prefix, including requests after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    /// Host-prefixed dialect with numeric opcode after the address.
    HostPrefixed {
        /// Host written at the start of every line.
        host: String,
        /// Port written after the host.
        port: u16,
        /// Record separator used by the server.
        separator: Separator,
    },
    /// Identity-first dialect with trailing opcode.
    IdentityFirst {
        /// Record separator used by the server.
        separator: Separator,
    },
}

impl Profile {
    /// Host-prefixed profile with the dialect's default separator.
    pub fn host_prefixed(host: impl Into<String>, port: u16) -> Self {
        Self::HostPrefixed {
            host: host.into(),
            port,
            separator: ProfileKind::HostPrefixed.default_separator(),
        }
    }

    /// Identity-first profile with the dialect's default separator.
    pub fn identity_first() -> Self {
        Self::IdentityFirst { separator: ProfileKind::IdentityFirst.default_separator() }
    }

    /// Build a profile from configuration.
    ///
    /// `separator` overrides the dialect default when set.
    pub fn from_kind(
        kind: ProfileKind,
        host: &str,
        port: u16,
        separator: Option<Separator>,
    ) -> Self {
        let separator = separator.unwrap_or_else(|| kind.default_separator());
        match kind {
            ProfileKind::HostPrefixed => Self::HostPrefixed { host: host.to_owned(), port, separator },
            ProfileKind::IdentityFirst => Self::IdentityFirst { separator },
        }
    }

    /// Dialect of this profile.
    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::HostPrefixed { .. } => ProfileKind::HostPrefixed,
            Self::IdentityFirst { .. } => ProfileKind::IdentityFirst,
        }
    }

    /// Record separator for multi-record responses.
    pub fn separator(&self) -> Separator {
        match self {
            Self::HostPrefixed { separator, .. } | Self::IdentityFirst { separator } => *separator,
        }
    }

    /// Response framing implied by the separator.
    ///
    /// Records separated by real line breaks arrive as several wire lines,
    /// so they must be read as a burst.
    pub fn framing(&self) -> ResponseFraming {
        match self.separator() {
            Separator::Newline => ResponseFraming::Burst,
            Separator::EscapedNewline | Separator::SlashN => ResponseFraming::SingleLine,
        }
    }

    /// Wire opcode for a request kind under this profile.
    pub fn opcode(&self, kind: RequestKind) -> u8 {
        self.kind().opcode(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialects_swap_list_opcodes() {
        let a = ProfileKind::HostPrefixed;
        let b = ProfileKind::IdentityFirst;

        assert_eq!(a.opcode(RequestKind::ListContacts), 2);
        assert_eq!(a.opcode(RequestKind::ListMessages), 4);
        assert_eq!(b.opcode(RequestKind::ListContacts), 4);
        assert_eq!(b.opcode(RequestKind::ListMessages), 2);

        for kind in [a, b] {
            assert_eq!(kind.opcode(RequestKind::Login), 1);
            assert_eq!(kind.opcode(RequestKind::SendMessage), 3);
        }
    }

    #[test]
    fn separator_override_changes_framing() {
        let profile = Profile::from_kind(ProfileKind::IdentityFirst, "h", 1, None);
        assert_eq!(profile.framing(), ResponseFraming::Burst);

        let profile =
            Profile::from_kind(ProfileKind::IdentityFirst, "h", 1, Some(Separator::EscapedNewline));
        assert_eq!(profile.framing(), ResponseFraming::SingleLine);
    }

    #[test]
    fn host_prefixed_defaults_to_escaped_separator() {
        let profile = Profile::host_prefixed("localhost", 5000);
        assert_eq!(profile.separator(), Separator::EscapedNewline);
        assert_eq!(profile.separator().literal(), Some("\\n"));
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("host-prefixed".parse::<ProfileKind>(), Ok(ProfileKind::HostPrefixed));
        assert_eq!("identity-first".parse::<ProfileKind>(), Ok(ProfileKind::IdentityFirst));
        assert!("c".parse::<ProfileKind>().is_err());
        assert_eq!("slash".parse::<Separator>(), Ok(Separator::SlashN));
    }
}
