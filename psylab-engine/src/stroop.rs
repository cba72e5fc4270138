//! Stroop color-word interference: report the ink, not the word.

use psylab_core::{
    EngineResult, ExpectedResponse, Feedback, InkColor, InstructionScreen, Options,
    ResponseRecord, Stimulus, TrialMetadata, TrialSpec, parse_options,
};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::Serialize;
use serde_json::Value;

use crate::config::StroopConfig;
use crate::contract::Experiment;
use crate::registry::ExperimentKind;
use crate::results::{ExperimentResults, StroopResults};
use crate::state::EngineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StroopTrial {
    pub word: InkColor,
    pub ink: InkColor,
}

impl StroopTrial {
    pub fn congruent(&self) -> bool {
        self.word == self.ink
    }
}

/// Build the shuffled trial pool.
///
/// `floor(total * congruent_ratio)` trials print a color in its own ink; the
/// rest use an ink drawn from the three other colors.
pub fn build_trials<R: Rng + ?Sized>(config: &StroopConfig, rng: &mut R) -> Vec<StroopTrial> {
    let total = config.total_trials;
    let num_congruent = ((total as f64 * config.congruent_ratio).floor() as u32).min(total);

    let mut trials = Vec::with_capacity(total as usize);
    for _ in 0..num_congruent {
        let color = *InkColor::ALL.choose(&mut *rng).unwrap_or(&InkColor::Red);
        trials.push(StroopTrial {
            word: color,
            ink: color,
        });
    }
    for _ in num_congruent..total {
        let word = *InkColor::ALL.choose(&mut *rng).unwrap_or(&InkColor::Red);
        let others: Vec<InkColor> = InkColor::ALL.into_iter().filter(|c| *c != word).collect();
        let ink = *others.choose(&mut *rng).unwrap_or(&InkColor::Blue);
        trials.push(StroopTrial { word, ink });
    }
    trials.shuffle(rng);
    trials
}

/// Stroop engine. The pool is fixed at construction, so no generator is kept.
pub struct Stroop {
    config: StroopConfig,
    state: EngineState,
    trials: Vec<StroopTrial>,
    cursor: usize,
    correct_count: u32,
    rt_sum: f64,
}

impl Stroop {
    pub fn configure<R: Rng>(options: &Options, rng: R) -> EngineResult<Self> {
        let config: StroopConfig = parse_options(options)?;
        Self::new(config, rng)
    }

    pub fn new<R: Rng>(config: StroopConfig, mut rng: R) -> EngineResult<Self> {
        let config = config.validated()?;
        let trials = build_trials(&config, &mut rng);
        tracing::debug!(
            total = trials.len(),
            congruent = trials.iter().filter(|t| t.congruent()).count(),
            "built Stroop trials"
        );
        Ok(Self {
            config,
            state: EngineState::new(),
            trials,
            cursor: 0,
            correct_count: 0,
            rt_sum: 0.0,
        })
    }

    pub fn trials(&self) -> &[StroopTrial] {
        &self.trials
    }

    /// Proportion correct among recorded trials of one congruency.
    fn accuracy_where(&self, congruent: bool) -> f64 {
        let (correct, total) = self
            .state
            .history()
            .iter()
            .filter(|r| r.metadata == TrialMetadata::Stroop { congruent })
            .fold((0u32, 0u32), |(c, t), r| {
                (c + u32::from(r.correct == Some(true)), t + 1)
            });
        correct as f64 / total.max(1) as f64
    }
}

impl Experiment for Stroop {
    fn kind(&self) -> ExperimentKind {
        ExperimentKind::Stroop
    }

    fn configuration(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    fn instructions(&self) -> Vec<InstructionScreen> {
        let keys = self
            .config
            .keymap
            .iter()
            .map(|(color, key)| format!("{color} = {key}"))
            .collect::<Vec<_>>()
            .join(", ");
        vec![InstructionScreen::text(
            "Stroop Task",
            format!("Report the INK color, not the word. Keys: {keys}."),
        )]
    }

    fn end_practice(&mut self) {
        self.state.begin_test();
    }

    fn next_trial(&mut self) -> Option<TrialSpec> {
        if let Some(pending) = self.state.pending() {
            return Some(pending.clone());
        }
        let trial = *self.trials.get(self.cursor)?;
        self.cursor += 1;
        let expected = self.config.keymap.key(trial.ink).to_string();
        Some(self.state.issue(
            Stimulus::ColorWord {
                word: trial.word.word(),
                ink_color: trial.ink,
            },
            Some(ExpectedResponse::Key(expected)),
            TrialMetadata::Stroop {
                congruent: trial.congruent(),
            },
        ))
    }

    fn record_response(&mut self, response: ResponseRecord) -> EngineResult<Feedback> {
        let scored = self.state.accept(response)?;
        let correct = scored.correct();
        if correct {
            self.correct_count += 1;
        }
        if scored.response.response_time_ms > 0.0 {
            self.rt_sum += scored.response.response_time_ms;
        }
        tracing::debug!(trial = scored.trial.trial_number, correct, "Stroop response");

        if self.is_complete() {
            self.state.finish();
        }
        Ok(Feedback {
            correct,
            message: Some(if correct { "Correct" } else { "Incorrect" }.to_string()),
            continue_session: !self.is_complete(),
        })
    }

    fn is_complete(&self) -> bool {
        self.state.pending().is_none() && self.cursor >= self.trials.len()
    }

    fn results(&self) -> ExperimentResults {
        let attempted = self.state.history().len();
        let n = attempted.max(1) as f64;
        ExperimentResults::Stroop(StroopResults {
            accuracy: self.correct_count as f64 / n,
            mean_rt_ms: self.rt_sum / n,
            trials_attempted: attempted,
            congruent_accuracy: self.accuracy_where(true),
            incongruent_accuracy: self.accuracy_where(false),
        })
    }

    fn state(&self) -> &EngineState {
        &self.state
    }
}
