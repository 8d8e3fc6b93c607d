//! Linechat console client.
//!
//! # Usage
//!
//! ```bash
//! # Host-prefixed server, log in right away
//! linechat --host chat.example --port 5000 --username alice
//!
//! # Identity-first server with pushed messages
//! linechat --profile identity-first --username alice --password secret --listen
//! ```
//!
//! Type `/help` once running for the list of commands.

mod console;

use std::time::Duration;

use clap::Parser;
use linechat_app::{Runtime, ServerTarget};
use linechat_client::{ConnectionConfig, Session, SessionConfig, TcpConnector};
use linechat_proto::{ProfileKind, Separator};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::console::ConsoleDriver;

/// Linechat console client
#[derive(Parser, Debug)]
#[command(name = "linechat")]
#[command(about = "Console client for line-oriented chat servers")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Wire dialect (host-prefixed, identity-first)
    #[arg(long, default_value = "host-prefixed")]
    profile: ProfileKind,

    /// Record separator in list replies (escaped, slash, newline)
    ///
    /// Defaults to the separator of the chosen dialect.
    #[arg(long)]
    separator: Option<Separator>,

    /// Log in as this user at startup
    #[arg(short, long)]
    username: Option<String>,

    /// Password, for dialects that send one
    #[arg(long)]
    password: Option<String>,

    /// Keep reading pushed messages in the background
    #[arg(long)]
    listen: bool,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    connect_timeout_ms: u64,

    /// Reply timeout in milliseconds (waits forever when unset)
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so they never interleave with the chat transcript.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(run(args));

    // A blocking stdin read cannot be cancelled; do not wait for it.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let connection = ConnectionConfig {
        connect_timeout: Some(Duration::from_millis(args.connect_timeout_ms)),
        read_timeout: args.read_timeout_ms.map(Duration::from_millis),
        ..ConnectionConfig::default()
    };
    let config = SessionConfig {
        profile: args.profile,
        separator: args.separator,
        connection: connection.clone(),
        listen: args.listen,
    };
    let target = ServerTarget { host: args.host, port: args.port };

    tracing::info!(%target, profile = %args.profile, listen = args.listen, "linechat starting");

    let session = Session::new(TcpConnector::new(connection), config);
    let driver = ConsoleDriver::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    let mut runtime = Runtime::new(driver, session, target);

    if let Some(username) = args.username {
        runtime.login(username, args.password);
    }

    runtime.run().await?;
    Ok(())
}
