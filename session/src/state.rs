use std::fmt;

use log::debug;

use crate::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Connected, and running the session's authority
    Hosting,
    Connected,
    Leaving,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Hosting => "hosting",
            SessionState::Connected => "connected",
            SessionState::Leaving => "leaving",
        };
        f.write_str(name)
    }
}

/// Holds a manager in `Connecting` while a create or join is under way.
/// Unless completed, dropping it returns the manager to `Disconnected`,
/// which is what happens when the lifecycle future is cancelled or fails
pub(crate) struct Transition<'a> {
    state: &'a mut SessionState,
    completed: bool,
}

impl<'a> Transition<'a> {
    pub fn begin(state: &'a mut SessionState, operation: &'static str) -> Result<Self, SessionError> {
        if *state != SessionState::Disconnected {
            return Err(SessionError::InvalidTransition {
                operation,
                state: *state,
            });
        }
        *state = SessionState::Connecting;
        Ok(Self {
            state,
            completed: false,
        })
    }

    pub fn complete(mut self, state: SessionState) {
        *self.state = state;
        self.completed = true;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.completed {
            debug!("connection attempt abandoned");
            *self.state = SessionState::Disconnected;
        }
    }
}
