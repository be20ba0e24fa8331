use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    Open,
    Submitting,
    Error(String),
}

impl ModalState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Submitting => "submitting",
            Self::Error(_) => "in error",
        }
    }
}

impl fmt::Display for ModalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot {action} a modal that is {state}")]
pub struct IllegalTransition {
    pub action: &'static str,
    pub state: &'static str,
}

/// Closed, then Open, then Submitting, then Closed on success or Error on failure.
/// Error can be retried or dismissed. Illegal moves leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct ModalController {
    state: ModalState,
}

impl ModalController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &ModalState {
        &self.state
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self.state, ModalState::Closed)
    }

    fn illegal(&self, action: &'static str) -> IllegalTransition {
        IllegalTransition {
            action,
            state: self.state.name(),
        }
    }

    pub fn open(&mut self) -> Result<(), IllegalTransition> {
        match self.state {
            ModalState::Closed => {
                self.state = ModalState::Open;
                Ok(())
            }
            _ => Err(self.illegal("open")),
        }
    }

    /// Start submitting from Open, or retry from Error.
    pub fn submit(&mut self) -> Result<(), IllegalTransition> {
        match self.state {
            ModalState::Open | ModalState::Error(_) => {
                self.state = ModalState::Submitting;
                Ok(())
            }
            _ => Err(self.illegal("submit")),
        }
    }

    pub fn succeed(&mut self) -> Result<(), IllegalTransition> {
        match self.state {
            ModalState::Submitting => {
                self.state = ModalState::Closed;
                Ok(())
            }
            _ => Err(self.illegal("complete")),
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), IllegalTransition> {
        match self.state {
            ModalState::Submitting => {
                self.state = ModalState::Error(message.into());
                Ok(())
            }
            _ => Err(self.illegal("fail")),
        }
    }

    /// Dismiss without submitting. Not allowed mid-submit.
    pub fn close(&mut self) -> Result<(), IllegalTransition> {
        match self.state {
            ModalState::Open | ModalState::Error(_) => {
                self.state = ModalState::Closed;
                Ok(())
            }
            _ => Err(self.illegal("close")),
        }
    }
}
