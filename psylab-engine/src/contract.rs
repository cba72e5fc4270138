//! The lifecycle every experiment variant implements.

use psylab_core::{
    ConfigSchema, EngineError, EngineResult, Feedback, InstructionScreen, ResponseRecord,
    TrialSpec,
};
use serde_json::Value;

use crate::registry::ExperimentKind;
use crate::results::ExperimentResults;
use crate::state::{EngineState, Progress, StateSnapshot};

/// An experiment instance bound to one subject session.
///
/// Instances are built by each engine's `configure`, or through
/// [`crate::registry::create`]. Calls must be serialized per instance.
pub trait Experiment: Send {
    fn kind(&self) -> ExperimentKind;

    /// The effective configuration after defaults and validation.
    fn configuration(&self) -> Value;

    fn instructions(&self) -> Vec<InstructionScreen>;

    /// A practice batch, or `None` when the variant has no practice phase
    /// or the test phase has already started.
    fn practice_trials(&mut self) -> Option<Vec<TrialSpec>> {
        None
    }

    /// Score a practice response. History and counters are not touched.
    fn score_practice(
        &self,
        trial: &TrialSpec,
        response: &ResponseRecord,
    ) -> EngineResult<Feedback> {
        let correct = check_practice(trial, response)?;
        Ok(Feedback {
            correct,
            message: Some(if correct { "Correct!" } else { "Not quite." }.to_string()),
            continue_session: true,
        })
    }

    /// Leave practice for the test phase. Implied by the first `next_trial`.
    fn end_practice(&mut self);

    /// The next test trial, or `None` once stopping criteria are met.
    ///
    /// While a trial is pending the same trial is returned again.
    fn next_trial(&mut self) -> Option<TrialSpec>;

    fn record_response(&mut self, response: ResponseRecord) -> EngineResult<Feedback>;

    /// True exactly when `next_trial` would return `None`.
    fn is_complete(&self) -> bool;

    fn results(&self) -> ExperimentResults;

    fn state(&self) -> &EngineState;

    fn progress(&self) -> Progress {
        self.state().progress()
    }

    fn history(&self) -> &[ResponseRecord] {
        self.state().history()
    }

    fn snapshot(&self) -> StateSnapshot {
        self.state().snapshot(self.kind(), self.configuration())
    }

    fn default_configuration(&self) -> Value {
        self.kind().default_configuration()
    }

    fn configuration_schema(&self) -> ConfigSchema {
        self.kind().schema()
    }
}

/// Validate a practice response against its trial and score it.
pub(crate) fn check_practice(trial: &TrialSpec, response: &ResponseRecord) -> EngineResult<bool> {
    response.validate()?;
    if !trial.is_practice() {
        return Err(EngineError::InvalidResponse(format!(
            "trial {} is not a practice trial",
            trial.trial_number
        )));
    }
    if trial.trial_number != response.trial_number {
        return Err(EngineError::InvalidResponse(format!(
            "response is for trial {}, practice trial is {}",
            response.trial_number, trial.trial_number
        )));
    }
    Ok(trial.score(response))
}
