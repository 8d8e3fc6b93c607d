//! Client configuration.

use std::time::Duration;

use linechat_proto::{ProfileKind, Separator};

/// Connection-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Limit on establishing the TCP connection. `None` waits for the OS.
    pub connect_timeout: Option<Duration>,
    /// Limit on waiting for the reply to a request. `None` waits forever.
    /// Never applies to the background listener.
    pub read_timeout: Option<Duration>,
    /// Longest accepted incoming line, in bytes.
    pub max_line_length: usize,
    /// How long to keep collecting follow-up lines of a burst response.
    pub burst_grace: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            read_timeout: None,
            max_line_length: 64 * 1024,
            burst_grace: Duration::from_millis(50),
        }
    }
}

impl ConnectionConfig {
    /// Settings for an interactive front-end: a hung server surfaces as a
    /// timeout instead of a frozen request.
    pub fn interactive() -> Self {
        Self { read_timeout: Some(Duration::from_secs(10)), ..Self::default() }
    }
}

/// Session-level settings, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Wire dialect.
    pub profile: ProfileKind,
    /// Record separator override. `None` uses the dialect default.
    pub separator: Option<Separator>,
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Run the background listener for unsolicited messages after login.
    pub listen: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile: ProfileKind::HostPrefixed,
            separator: None,
            connection: ConnectionConfig::default(),
            listen: false,
        }
    }
}
