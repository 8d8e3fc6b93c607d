//! Driver trait for abstracting front-end I/O.
//!
//! The [`Driver`] trait decouples the application runtime from how input is
//! collected and how state is shown. Each front-end implements the trait,
//! while the generic [`crate::Runtime`] handles all orchestration. Network
//! I/O is not the driver's concern: it goes through the [`crate::Bridge`].

use std::future::Future;

use crate::{App, UserInput};

/// Abstracts user-facing I/O for the application runtime.
///
/// # Implementations
///
/// - **Console**: reads commands from stdin, prints to stdout
/// - **Simulation**: replays a scripted command sequence
pub trait Driver: Send {
    /// Front-end specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next user command.
    ///
    /// Returns `None` when input is exhausted (end of file, script done).
    /// Must be cancel-safe: the runtime drops the future whenever a bridge
    /// event arrives first, and polls again afterwards.
    fn poll_input(&mut self) -> impl Future<Output = Result<Option<UserInput>, Self::Error>> + Send;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Clean up front-end resources.
    fn stop(&mut self);
}
