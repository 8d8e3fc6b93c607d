//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: session operations running off the loop
//! - [`Driver`]: front-end specific input and rendering

use linechat_client::{Connector, Session};
use tokio::sync::mpsc;

use crate::{App, AppAction, AppEvent, Bridge, Driver, ServerTarget, UserInput};

enum Step {
    Event(AppEvent),
    Input(Option<UserInput>),
}

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: front-end driver
/// - `C`: connector used by the session
pub struct Runtime<D: Driver, C: Connector> {
    driver: D,
    app: App,
    bridge: Bridge<C>,
    events: mpsc::UnboundedReceiver<AppEvent>,
}

impl<D: Driver, C: Connector> Runtime<D, C> {
    /// Create a runtime for `session`, logging in to `target`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(driver: D, session: Session<C>, target: ServerTarget) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let app = App::new(target.to_string());
        let bridge = Bridge::spawn(session, target, events_tx);
        Self { driver, app, bridge, events }
    }

    /// Run the main event loop until the user quits or input ends.
    ///
    /// Each cycle waits for whichever comes first: a bridge event or a user
    /// command. Bridge events take priority so a burst of completions is
    /// rendered before more input is read.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to read input or render.
    pub async fn run(mut self) -> Result<App, D::Error> {
        self.driver.render(&self.app)?;

        let result = self.event_loop().await;

        self.bridge.shutdown().await;
        self.driver.stop();
        result.map(|()| self.app)
    }

    /// Queue a login before the loop starts, as if the user had typed it.
    pub fn login(&mut self, username: String, password: Option<String>) {
        let actions = self.app.login(username, password);
        for action in actions {
            if action.is_session_op() {
                self.bridge.process_app_action(action);
            }
        }
    }

    async fn event_loop(&mut self) -> Result<(), D::Error> {
        loop {
            let step = tokio::select! {
                biased;
                Some(event) = self.events.recv() => Step::Event(event),
                input = self.driver.poll_input() => Step::Input(input?),
            };

            let actions = match step {
                Step::Event(event) => self.app.handle(event),
                Step::Input(Some(input)) => self.app.apply(input),
                Step::Input(None) => {
                    tracing::debug!("input closed");
                    return Ok(());
                },
            };

            if self.process_actions(actions)? {
                return Ok(());
            }
        }
    }

    /// Execute App actions.
    ///
    /// Returns `true` if the application should quit.
    fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        for action in actions {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::Quit => return Ok(true),
                AppAction::Login { .. }
                | AppAction::ListContacts
                | AppAction::SelectContact { .. }
                | AppAction::LoadHistory
                | AppAction::SendMessage { .. }
                | AppAction::Logout => self.bridge.process_app_action(action),
            }
        }
        Ok(false)
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }
}
