/// Pipeline lifecycle
use mastering_core::{MasteringError, Result};

/// Where a pipeline is in its single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Built and validated, not yet run
    Configured,
    /// Pass 1: measuring integrated loudness
    Measuring,
    /// Pass 2: processing and writing output
    Processing,
    /// Output written and finalized
    Done,
    /// Aborted by an error
    Failed,
    /// Aborted by cooperative cancellation
    Cancelled,
}

impl PipelineState {
    /// No stage runs after a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: Self) -> bool {
        use PipelineState::{Cancelled, Configured, Done, Failed, Measuring, Processing};
        match (self, next) {
            (Configured, Measuring | Processing)
            | (Measuring, Processing)
            | (Processing, Done) => true,
            (Configured | Measuring | Processing, Failed | Cancelled) => true,
            _ => false,
        }
    }

    /// Move to `next`
    ///
    /// # Errors
    /// Returns `MasteringError::InvalidState` for an illegal transition
    pub fn transition(&mut self, next: Self) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(MasteringError::invalid_state(format!(
                "cannot go from {self} to {next}"
            )));
        }
        tracing::debug!(from = %self, to = %next, "Pipeline state change");
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configured => "configured",
            Self::Measuring => "measuring",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_paths() {
        let mut state = PipelineState::Configured;
        state.transition(PipelineState::Measuring).unwrap();
        state.transition(PipelineState::Processing).unwrap();
        state.transition(PipelineState::Done).unwrap();
        assert!(state.is_terminal());

        let mut state = PipelineState::Configured;
        state.transition(PipelineState::Processing).unwrap();
        state.transition(PipelineState::Done).unwrap();
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [
            PipelineState::Done,
            PipelineState::Failed,
            PipelineState::Cancelled,
        ] {
            for next in [
                PipelineState::Configured,
                PipelineState::Measuring,
                PipelineState::Processing,
                PipelineState::Done,
                PipelineState::Failed,
            ] {
                let mut state = terminal;
                assert!(state.transition(next).is_err(), "{terminal} -> {next}");
                assert_eq!(state, terminal);
            }
        }
    }

    #[test]
    fn no_going_back() {
        let mut state = PipelineState::Processing;
        assert!(matches!(
            state.transition(PipelineState::Measuring),
            Err(MasteringError::InvalidState(_))
        ));
        assert!(!PipelineState::Measuring.can_transition_to(PipelineState::Done));
    }
}
