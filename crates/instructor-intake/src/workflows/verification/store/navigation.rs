use tracing::debug;

use super::{StoreError, VerificationStore};
use crate::workflows::verification::steps::StepId;
use crate::workflows::verification::validation::validate_step;

impl VerificationStore {
    pub fn current_step(&self) -> StepId {
        let index = self.inner.state().current_step;
        StepId::from_index(index).unwrap_or(StepId::Review)
    }

    /// Whether the configured gate lets the user leave the current step.
    pub fn can_proceed(&self) -> bool {
        let state = self.inner.state();
        self.inner
            .gate
            .can_proceed(state.current_step_state(), &state.document)
    }

    /// Advance one step. The last step is a fixed point.
    pub fn next_step(&self) -> Result<StepId, StoreError> {
        let (current, errors) = {
            let mut state = self.inner.state();
            let current = StepId::from_index(state.current_step).unwrap_or(StepId::Review);
            if self
                .inner
                .gate
                .can_proceed(state.current_step_state(), &state.document)
            {
                let next = StepId::from_index(current.index() + 1).unwrap_or(current);
                state.current_step = next.index();
                self.inner.persist_locally(&mut state);
                debug!(from = current.slug(), to = next.slug(), "advanced step");
                return Ok(next);
            }
            (current, validate_step(current, &state.document).errors)
        };

        Err(self.fail(
            current.slug(),
            "Step incomplete",
            StoreError::StepIncomplete {
                step: current,
                errors,
            },
        ))
    }

    /// Go back one step. The first step is a fixed point.
    pub fn previous_step(&self) -> StepId {
        let mut state = self.inner.state();
        let previous = StepId::from_index(state.current_step.saturating_sub(1))
            .unwrap_or(StepId::PersonalInformation);
        state.current_step = previous.index();
        self.inner.persist_locally(&mut state);
        previous
    }

    /// Jump straight to a step. Not gated.
    pub fn go_to_step(&self, step: StepId) -> StepId {
        let mut state = self.inner.state();
        state.current_step = step.index();
        self.inner.persist_locally(&mut state);
        step
    }
}
