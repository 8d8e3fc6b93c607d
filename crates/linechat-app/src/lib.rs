//! Application layer for linechat
//!
//! Pure state machine and generic runtime for chat front-ends, so the same
//! orchestration code runs in the console client and in simulation tests.
//!
//! # Components
//!
//! - [`App`]: UI state machine (login state, contacts, open conversation)
//! - [`Bridge`]: runs session operations off the UI loop and reports back as
//!   [`AppEvent`]s
//! - [`Driver`]: trait for front-end specific input and rendering
//! - [`Runtime`]: generic orchestration loop using a [`Driver`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use bridge::{Bridge, ServerTarget};
pub use driver::Driver;
pub use event::AppEvent;
pub use input::UserInput;
pub use runtime::Runtime;
pub use state::{ConnectionState, Conversation};
