//! Digit span: an adaptive staircase over sequence length.
//!
//! Each correct recall lengthens the next sequence by one. A wrong recall
//! repeats the length until `trials_per_length` attempts fail, which counts
//! as a failed length and moves on anyway. The run stops once the length
//! passes `max_length` or `failure_threshold` lengths fail in a row. In
//! `both` mode the first stop ends the forward staircase and restarts it
//! backward.

use std::collections::BTreeMap;

use psylab_core::{
    EngineResult, ExpectedResponse, Feedback, InstructionScreen, Options, ResponseRecord,
    SpanDirection, Stimulus, TrialMetadata, TrialSpec, TrialType, parse_options,
};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::config::{DIGIT_POOL, DigitSpanConfig, SpanMode};
use crate::contract::{Experiment, check_practice};
use crate::registry::ExperimentKind;
use crate::results::{DigitSpanResults, ExperimentResults};
use crate::state::EngineState;

const PRACTICE_TRIALS: usize = 2;

/// Staircase counters for the direction currently running.
#[derive(Debug, Clone, PartialEq)]
pub struct Staircase {
    pub direction: SpanDirection,
    pub current_length: u32,
    pub trials_at_current_length: u32,
    pub consecutive_failures: u32,
    /// Live counter, reset with the direction switch.
    pub max_span_achieved: u32,
    pub forward_complete: bool,
}

/// What a scored response did to the staircase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Advanced,
    Retry,
    LengthFailed,
}

impl Staircase {
    fn new(config: &DigitSpanConfig) -> Self {
        Self {
            direction: config.direction.first_direction(),
            current_length: config.starting_length,
            trials_at_current_length: 0,
            consecutive_failures: 0,
            max_span_achieved: 0,
            forward_complete: false,
        }
    }

    fn apply(&mut self, correct: bool, trials_per_length: u32) -> Step {
        if correct {
            self.consecutive_failures = 0;
            self.max_span_achieved = self.max_span_achieved.max(self.current_length);
            self.current_length += 1;
            self.trials_at_current_length = 0;
            return Step::Advanced;
        }

        self.trials_at_current_length += 1;
        if self.trials_at_current_length >= trials_per_length {
            self.consecutive_failures += 1;
            self.current_length += 1;
            self.trials_at_current_length = 0;
            Step::LengthFailed
        } else {
            Step::Retry
        }
    }

    fn stopped(&self, config: &DigitSpanConfig) -> bool {
        self.current_length > config.max_length
            || self.consecutive_failures >= config.failure_threshold
    }

    fn restart_backward(&mut self, starting_length: u32) {
        self.forward_complete = true;
        self.direction = SpanDirection::Backward;
        self.current_length = starting_length;
        self.trials_at_current_length = 0;
        self.consecutive_failures = 0;
        self.max_span_achieved = 0;
    }
}

/// The digit string a subject must type for `digits` shown in order.
pub fn expected_digits(digits: &[u8], direction: SpanDirection) -> String {
    let as_char = |d: &u8| char::from(b'0' + d);
    match direction {
        SpanDirection::Forward => digits.iter().map(as_char).collect(),
        SpanDirection::Backward => digits.iter().rev().map(as_char).collect(),
    }
}

pub struct DigitSpan<R = StdRng> {
    config: DigitSpanConfig,
    rng: R,
    state: EngineState,
    staircase: Staircase,
}

impl<R: Rng> DigitSpan<R> {
    pub fn configure(options: &Options, rng: R) -> EngineResult<Self> {
        let config: DigitSpanConfig = parse_options(options)?;
        Self::new(config, rng)
    }

    pub fn new(config: DigitSpanConfig, rng: R) -> EngineResult<Self> {
        let config = config.validated()?;
        tracing::debug!(?config, "configured digit span");
        Ok(Self {
            staircase: Staircase::new(&config),
            config,
            rng,
            state: EngineState::new(),
        })
    }

    pub fn staircase(&self) -> &Staircase {
        &self.staircase
    }

    fn draw_digits(&mut self, length: u32) -> Vec<u8> {
        let mut pool: Vec<u8> = (0..DIGIT_POOL as u8).collect();
        pool.shuffle(&mut self.rng);
        pool.truncate(length.min(DIGIT_POOL) as usize);
        pool
    }

    fn stimulus(&self, digits: Vec<u8>, direction: SpanDirection) -> Stimulus {
        Stimulus::DigitSequence {
            length: digits.len() as u32,
            digits,
            direction,
            digit_display_time_ms: self.config.digit_display_time_ms,
            inter_digit_interval_ms: self.config.inter_digit_interval_ms,
        }
    }

    fn feedback_message(&self, step: Step) -> String {
        let length = self.staircase.current_length;
        match step {
            Step::Advanced => format!("Correct! Moving to {length} digits."),
            Step::Retry => format!("Not quite. You'll get another try at {length} digits."),
            Step::LengthFailed => "That length was challenging. Let's try the next one.".into(),
        }
    }

    /// Highest correctly recalled length per direction, from history.
    fn spans(&self) -> (u32, u32) {
        let mut forward = 0;
        let mut backward = 0;
        for record in self.state.history() {
            if record.correct != Some(true) {
                continue;
            }
            if let TrialMetadata::DigitSpan {
                span_length,
                direction,
                ..
            } = record.metadata
            {
                let best = match direction {
                    SpanDirection::Forward => &mut forward,
                    SpanDirection::Backward => &mut backward,
                };
                *best = (*best).max(span_length);
            }
        }
        (forward, backward)
    }

    fn accuracy_by_length(&self) -> BTreeMap<u32, f64> {
        let mut tally: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
        for record in self.state.history() {
            if let TrialMetadata::DigitSpan { span_length, .. } = record.metadata {
                let entry = tally.entry(span_length).or_default();
                entry.1 += 1;
                if record.correct == Some(true) {
                    entry.0 += 1;
                }
            }
        }
        tally
            .into_iter()
            .map(|(length, (correct, total))| (length, correct as f64 / total as f64))
            .collect()
    }
}

impl<R: Rng + Send> Experiment for DigitSpan<R> {
    fn kind(&self) -> ExperimentKind {
        ExperimentKind::DigitSpan
    }

    fn configuration(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    fn instructions(&self) -> Vec<InstructionScreen> {
        let mut screens = vec![InstructionScreen::text(
            "Digit Span Test",
            "This test measures your working memory capacity.\n\n\
             You'll see a sequence of numbers, one at a time. After the sequence, \
             type the numbers you remember. Sequences get longer as you succeed.\n\n\
             Pay close attention to each digit. Order matters, and there's no rush.",
        )];
        if self.config.direction.includes(SpanDirection::Forward) {
            screens.push(InstructionScreen::text(
                "Forward Span",
                "Recall the digits in the same order they were shown.\n\n\
                 Example: if you see 4, 7, 2 you type 472.",
            ));
        }
        if self.config.direction.includes(SpanDirection::Backward) {
            let lead = if self.config.direction == SpanMode::Both {
                "After the forward round, recall"
            } else {
                "Recall"
            };
            screens.push(InstructionScreen::text(
                "Backward Span",
                format!(
                    "{lead} the digits in reverse order.\n\n\
                     Example: if you see 4, 7, 2 you type 274."
                ),
            ));
        }
        screens.push(InstructionScreen::text(
            "Ready?",
            "We'll start with a few practice trials so you can get comfortable with the task.",
        ));
        screens
    }

    fn practice_trials(&mut self) -> Option<Vec<TrialSpec>> {
        if !self.state.enter_practice() {
            return None;
        }
        let length = self.config.starting_length.saturating_sub(1).max(2);
        let direction = self.staircase.direction;
        let trials = (1..=PRACTICE_TRIALS as u32)
            .map(|n| {
                let digits = self.draw_digits(length);
                let expected = expected_digits(&digits, direction);
                TrialSpec {
                    trial_number: n,
                    trial_type: TrialType::Practice,
                    stimulus: self.stimulus(digits, direction),
                    expected_response: Some(ExpectedResponse::Digits(expected)),
                    metadata: TrialMetadata::DigitSpan {
                        span_length: length,
                        direction,
                        attempt: 0,
                    },
                }
            })
            .collect();
        Some(trials)
    }

    fn score_practice(
        &self,
        trial: &TrialSpec,
        response: &ResponseRecord,
    ) -> EngineResult<Feedback> {
        let correct = check_practice(trial, response)?;
        let message = if correct { "Correct!" } else { "Not quite." };
        Ok(Feedback {
            correct,
            message: self.config.feedback_enabled.then(|| message.to_string()),
            continue_session: true,
        })
    }

    fn end_practice(&mut self) {
        self.state.begin_test();
    }

    fn next_trial(&mut self) -> Option<TrialSpec> {
        if let Some(pending) = self.state.pending() {
            return Some(pending.clone());
        }
        if self.is_complete() {
            return None;
        }

        let length = self.staircase.current_length;
        let direction = self.staircase.direction;
        let digits = self.draw_digits(length);
        let expected = expected_digits(&digits, direction);
        let metadata = TrialMetadata::DigitSpan {
            span_length: length,
            direction,
            attempt: self.staircase.trials_at_current_length,
        };
        let stimulus = self.stimulus(digits, direction);
        Some(
            self.state
                .issue(stimulus, Some(ExpectedResponse::Digits(expected)), metadata),
        )
    }

    fn record_response(&mut self, response: ResponseRecord) -> EngineResult<Feedback> {
        let scored = self.state.accept(response)?;
        let correct = scored.correct();
        let step = self
            .staircase
            .apply(correct, self.config.trials_per_length);
        tracing::debug!(
            trial = scored.trial.trial_number,
            correct,
            ?step,
            length = self.staircase.current_length,
            "digit span response"
        );
        let message = self.feedback_message(step);

        if self.staircase.stopped(&self.config) {
            if self.config.direction == SpanMode::Both && !self.staircase.forward_complete {
                tracing::info!(
                    forward_span = self.staircase.max_span_achieved,
                    "forward span finished, switching to backward"
                );
                self.staircase.restart_backward(self.config.starting_length);
            } else {
                self.state.finish();
            }
        }

        Ok(Feedback {
            correct,
            message: self.config.feedback_enabled.then_some(message),
            continue_session: !self.is_complete(),
        })
    }

    fn is_complete(&self) -> bool {
        self.state.pending().is_none() && self.staircase.stopped(&self.config)
    }

    fn results(&self) -> ExperimentResults {
        let mode = self.config.direction;
        let (forward, backward) = self.spans();
        let max_span_achieved = match self.staircase.direction {
            SpanDirection::Forward => forward,
            SpanDirection::Backward => backward,
        };
        ExperimentResults::DigitSpan(DigitSpanResults {
            max_span_achieved,
            forward_span: mode.includes(SpanDirection::Forward).then_some(forward),
            backward_span: mode.includes(SpanDirection::Backward).then_some(backward),
            total_span: (mode == SpanMode::Both).then_some(forward + backward),
            total_trials: self.state.history().len(),
            direction_mode: mode,
            accuracy_by_length: self.accuracy_by_length(),
        })
    }

    fn state(&self) -> &EngineState {
        &self.state
    }
}
