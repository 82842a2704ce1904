use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    Finalizing,
    Finalized,
    Failed,
}

impl SessionState {
    /// Past the point where the recording can change. Finalization
    /// attempts from here are no-ops.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Finalizing | SessionState::Finalized | SessionState::Failed
        )
    }

    /// Recording or paused.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    StartOver,
    End,
    Complete,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action:?} a session that is {from:?}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub action: SessionAction,
}

pub struct StateMachine {
    state: SessionState,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn current(&self) -> SessionState {
        self.state
    }

    fn transition(
        &mut self,
        allowed: &[SessionState],
        to: SessionState,
        action: SessionAction,
    ) -> Result<(), InvalidTransition> {
        if allowed.contains(&self.state) {
            self.state = to;
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(
            &[SessionState::Idle],
            SessionState::Recording,
            SessionAction::Start,
        )
    }

    pub fn pause(&mut self) -> Result<(), InvalidTransition> {
        self.transition(
            &[SessionState::Recording],
            SessionState::Paused,
            SessionAction::Pause,
        )
    }

    pub fn resume(&mut self) -> Result<(), InvalidTransition> {
        self.transition(
            &[SessionState::Paused],
            SessionState::Recording,
            SessionAction::Resume,
        )
    }

    pub fn start_over(&mut self) -> Result<(), InvalidTransition> {
        self.transition(
            &[SessionState::Recording, SessionState::Paused],
            SessionState::Recording,
            SessionAction::StartOver,
        )
    }

    pub fn end(&mut self) -> Result<(), InvalidTransition> {
        self.transition(
            &[SessionState::Recording, SessionState::Paused],
            SessionState::Finalizing,
            SessionAction::End,
        )
    }

    pub fn complete(&mut self) -> Result<(), InvalidTransition> {
        self.transition(
            &[SessionState::Finalizing],
            SessionState::Finalized,
            SessionAction::Complete,
        )
    }

    /// Any non-finished state can fail, including Finalizing when the
    /// merge goes wrong.
    pub fn fail(&mut self) -> Result<(), InvalidTransition> {
        self.transition(
            &[
                SessionState::Idle,
                SessionState::Recording,
                SessionState::Paused,
                SessionState::Finalizing,
            ],
            SessionState::Failed,
            SessionAction::Fail,
        )
    }
}
