//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` replays a script of user commands instead of reading a
//! terminal. It implements [`Driver`] so the same [`linechat_app::Runtime`]
//! orchestration code runs in both production and simulation.
//!
//! A script interleaves commands with waits on the rendered state, so a test
//! can express "log in, then once contacts are shown, select bob" without
//! sleeping.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use linechat_app::{App, Driver, UserInput};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

type Condition = Box<dyn Fn(&App) -> bool + Send + Sync>;

enum Step {
    Input(UserInput),
    WaitUntil(&'static str, Condition),
}

/// Frames rendered so far, shared with the test.
#[derive(Clone, Default)]
pub struct Frames {
    inner: Arc<Mutex<Vec<App>>>,
}

impl Frames {
    /// Last rendered state.
    pub fn last(&self) -> Option<App> {
        self.lock().last().cloned()
    }

    /// Number of renders.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was rendered yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Status messages in render order, deduplicated when repeated.
    pub fn statuses(&self) -> Vec<String> {
        let mut statuses: Vec<String> = Vec::new();
        for frame in self.lock().iter() {
            if let Some(status) = frame.status_message()
                && statuses.last().map(String::as_str) != Some(status)
            {
                statuses.push(status.to_owned());
            }
        }
        statuses
    }

    fn push(&self, app: &App) {
        self.lock().push(app.clone());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<App>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    script: VecDeque<Step>,
    frames: Frames,
    stopped: bool,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Driver with an empty script: input ends immediately.
    pub fn new() -> Self {
        Self { script: VecDeque::new(), frames: Frames::default(), stopped: false }
    }

    /// Append a command, parsed like a typed line. Blank lines are ignored.
    #[must_use]
    pub fn type_line(self, line: &str) -> Self {
        match UserInput::parse(line) {
            Some(input) => self.input(input),
            None => self,
        }
    }

    /// Append a command.
    #[must_use]
    pub fn input(mut self, input: UserInput) -> Self {
        self.script.push_back(Step::Input(input));
        self
    }

    /// Hold the script until a rendered frame satisfies `condition`.
    #[must_use]
    pub fn wait_until(
        mut self,
        label: &'static str,
        condition: impl Fn(&App) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.script.push_back(Step::WaitUntil(label, Box::new(condition)));
        self
    }

    /// Handle on the rendered frames.
    pub fn frames(&self) -> Frames {
        self.frames.clone()
    }

    /// Whether [`Driver::stop`] was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_input(&mut self) -> Result<Option<UserInput>, Self::Error> {
        loop {
            match self.script.front() {
                None => return Ok(None),
                Some(Step::Input(_)) => {
                    if let Some(Step::Input(input)) = self.script.pop_front() {
                        return Ok(Some(input));
                    }
                },
                Some(Step::WaitUntil(label, condition)) => {
                    let satisfied = self.frames.last().is_some_and(|app| condition(&app));
                    if !satisfied {
                        tracing::trace!(wait = label, "script waiting");
                        // Woken by the runtime when the next bridge event arrives.
                        std::future::pending::<()>().await;
                    }
                    self.script.pop_front();
                },
            }
        }
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.frames.push(app);
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
