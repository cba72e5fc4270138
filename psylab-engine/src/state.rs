use psylab_core::{
    EngineError, EngineResult, ExpectedResponse, Phase, ResponseRecord, Stimulus, TrialMetadata,
    TrialSpec, TrialType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ExperimentKind;

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub trial_number: u32,
    pub responses_recorded: usize,
    pub phase: Phase,
}

/// Serializable view of an instance for host-side storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub experiment_type: ExperimentKind,
    pub configuration: Value,
    pub trial_number: u32,
    pub phase: Phase,
    pub history: Vec<ResponseRecord>,
}

/// A response after the engine has scored it against its trial.
#[derive(Debug, Clone)]
pub struct Scored {
    pub trial: TrialSpec,
    pub response: ResponseRecord,
}

impl Scored {
    pub fn correct(&self) -> bool {
        self.response.correct == Some(true)
    }
}

/// Lifecycle state shared by every engine.
///
/// Holds the phase, the test trial counter, at most one pending trial and
/// the ordered response history. Algorithm counters live in the engines.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    phase: Phase,
    trial_number: u32,
    pending: Option<TrialSpec>,
    history: Vec<ResponseRecord>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn trial_number(&self) -> u32 {
        self.trial_number
    }

    pub fn pending(&self) -> Option<&TrialSpec> {
        self.pending.as_ref()
    }

    pub fn history(&self) -> &[ResponseRecord] {
        &self.history
    }

    /// Moves into practice if the test phase has not started yet.
    pub fn enter_practice(&mut self) -> bool {
        if self.phase == Phase::Configured {
            self.phase = Phase::Practice;
        }
        self.phase.is_practice()
    }

    pub fn begin_test(&mut self) {
        if self.phase.allows_practice() {
            tracing::debug!(from = ?self.phase, "entering test phase");
            self.phase = Phase::Test;
        }
    }

    pub fn finish(&mut self) {
        if !self.phase.is_complete() {
            tracing::info!(responses = self.history.len(), "experiment complete");
            self.phase = Phase::Complete;
        }
    }

    /// Numbers and stores the next test trial as pending.
    pub fn issue(
        &mut self,
        stimulus: Stimulus,
        expected_response: Option<ExpectedResponse>,
        metadata: TrialMetadata,
    ) -> TrialSpec {
        self.begin_test();
        self.trial_number += 1;
        let trial = TrialSpec {
            trial_number: self.trial_number,
            trial_type: TrialType::Test,
            stimulus,
            expected_response,
            metadata,
        };
        tracing::debug!(trial = trial.trial_number, "issued trial");
        self.pending = Some(trial.clone());
        trial
    }

    /// Scores a response against the pending trial and appends it to history.
    ///
    /// The stored record carries the engine's verdict and the pending
    /// trial's metadata, whatever the caller sent in those fields.
    pub fn accept(&mut self, mut response: ResponseRecord) -> EngineResult<Scored> {
        response.validate()?;
        let trial = match self.pending.take() {
            Some(trial) if trial.trial_number == response.trial_number => trial,
            Some(trial) => {
                let pending = trial.trial_number;
                self.pending = Some(trial);
                return Err(EngineError::InvalidResponse(format!(
                    "response is for trial {}, but trial {pending} is pending",
                    response.trial_number
                )));
            }
            None => {
                return Err(EngineError::InvalidResponse(format!(
                    "no trial is pending, got a response for trial {}",
                    response.trial_number
                )));
            }
        };

        response.correct = Some(trial.score(&response));
        response.metadata = trial.metadata.clone();
        self.history.push(response.clone());
        Ok(Scored { trial, response })
    }

    pub fn progress(&self) -> Progress {
        Progress {
            trial_number: self.trial_number,
            responses_recorded: self.history.len(),
            phase: self.phase,
        }
    }

    pub fn snapshot(&self, experiment_type: ExperimentKind, configuration: Value) -> StateSnapshot {
        StateSnapshot {
            experiment_type,
            configuration,
            trial_number: self.trial_number,
            phase: self.phase,
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_core::{InkColor, ResponseRecord};

    fn issue_one(state: &mut EngineState) -> TrialSpec {
        state.issue(
            Stimulus::ColorWord {
                word: "RED".into(),
                ink_color: InkColor::Red,
            },
            Some(ExpectedResponse::Key("r".into())),
            TrialMetadata::Stroop { congruent: true },
        )
    }

    #[test]
    fn issue_numbers_trials_and_starts_test() {
        let mut state = EngineState::new();
        assert_eq!(state.phase(), Phase::Configured);
        let first = issue_one(&mut state);
        assert_eq!(first.trial_number, 1);
        assert_eq!(state.phase(), Phase::Test);
        assert_eq!(state.pending(), Some(&first));
    }

    #[test]
    fn accept_scores_and_overwrites_metadata() {
        let mut state = EngineState::new();
        let trial = issue_one(&mut state);
        let mut response = ResponseRecord::new(trial.trial_number, Some("R".into()), 512.0);
        response.correct = Some(false);

        let scored = state.accept(response).unwrap();
        assert!(scored.correct());
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.history()[0].metadata, trial.metadata);
        assert!(state.pending().is_none());
    }

    #[test]
    fn accept_rejects_wrong_trial_without_touching_history() {
        let mut state = EngineState::new();
        let trial = issue_one(&mut state);
        let err = state
            .accept(ResponseRecord::new(trial.trial_number + 1, None, 0.0))
            .unwrap_err();
        assert!(err.is_invalid_response());
        assert!(state.history().is_empty());
        assert!(state.pending().is_some());
    }

    #[test]
    fn accept_requires_pending_trial() {
        let mut state = EngineState::new();
        assert!(state.accept(ResponseRecord::new(1, None, 0.0)).is_err());
    }

    #[test]
    fn practice_not_reentered_after_test() {
        let mut state = EngineState::new();
        assert!(state.enter_practice());
        state.begin_test();
        assert!(!state.enter_practice());
        assert_eq!(state.phase(), Phase::Test);
    }
}
