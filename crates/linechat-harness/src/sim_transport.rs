//! Turmoil-backed connector.
//!
//! Wraps turmoil's simulated TCP streams in the production
//! [`LineConnection`], so simulations exercise the real framing and close
//! paths. Only the socket is simulated.

use linechat_client::{ClientError, ConnectionConfig, Connector, LineConnection};
use turmoil::net::TcpStream;

/// [`Connector`] dialing hosts inside a turmoil simulation.
#[derive(Debug, Clone, Default)]
pub struct SimConnector {
    config: ConnectionConfig,
}

impl SimConnector {
    /// Connector using `config` for every connection.
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

impl Connector for SimConnector {
    type Transport = LineConnection<TcpStream>;

    async fn connect(&self, host: &str, port: u16) -> Result<Self::Transport, ClientError> {
        let addr = format!("{host}:{port}");
        let connect = TcpStream::connect(addr.as_str());

        let result = match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                ClientError::Connect { addr: addr.clone(), reason: format!("timed out after {limit:?}") }
            })?,
            None => connect.await,
        };
        let stream = result
            .map_err(|e| ClientError::Connect { addr: addr.clone(), reason: e.to_string() })?;

        tracing::debug!(peer = %addr, "simulated connection established");
        Ok(LineConnection::from_stream(addr, stream, self.config.max_line_length))
    }
}
