//! Test harness for the linechat client.
//!
//! Two ways to stand in for a real server:
//!
//! - [`MockTransport`] scripts one connection line by line, for exact control
//!   over what the client sees and for checking what it wrote.
//! - [`ChatServer`] runs an in-memory server inside a turmoil simulation,
//!   reached through [`SimConnector`], for whole flows over a real
//!   (simulated) TCP stack with deterministic timing.
//!
//! [`SimDriver`] replays scripted user commands through the same
//! [`linechat_app::Runtime`] the console front-end uses.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mock_transport;
pub mod sim_driver;
pub mod sim_server;
pub mod sim_transport;

pub use mock_transport::{MockConnector, MockTransport};
pub use sim_driver::{Frames, SimDriver, SimDriverError};
pub use sim_server::ChatServer;
pub use sim_transport::SimConnector;
