//! Sustained Attention to Response Task: go/no-go over a fixed digit stream.
//!
//! The whole sequence is built and shuffled once at configure time. The
//! subject responds to every digit except the target.

use psylab_core::{
    EngineResult, ExpectedResponse, Feedback, GoAction, InstructionScreen, Options,
    ResponseRecord, Stimulus, TrialMetadata, TrialSpec, TrialType, parse_options,
};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::Serialize;
use serde_json::Value;

use crate::config::{SART_FIXED_FONT_SIZE, SartConfig};
use crate::contract::{Experiment, check_practice};
use crate::registry::ExperimentKind;
use crate::results::{
    ExperimentResults, SartInterpretation, SartResults, mean, percent, round_to, sample_std_dev,
};
use crate::state::EngineState;

const PRACTICE_TRIALS: u32 = 20;

/// Seconds per trial used for the duration estimate shown to subjects.
const SECONDS_PER_TRIAL: f64 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SartTrial {
    pub digit: u8,
    pub is_target: bool,
    pub font_size: u32,
}

impl SartTrial {
    pub fn expected_action(&self) -> GoAction {
        if self.is_target {
            GoAction::Withhold
        } else {
            GoAction::Respond
        }
    }
}

/// Signal-detection category of one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Omission,
    CorrectRejection,
    Commission,
}

impl Outcome {
    pub fn classify(is_target: bool, responded: bool) -> Self {
        match (is_target, responded) {
            (true, true) => Outcome::Commission,
            (true, false) => Outcome::CorrectRejection,
            (false, true) => Outcome::Hit,
            (false, false) => Outcome::Omission,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Outcome::Hit | Outcome::CorrectRejection)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalCounts {
    pub hits: u32,
    pub omission_errors: u32,
    pub correct_rejections: u32,
    pub commission_errors: u32,
    /// Reaction times of hits, in order.
    pub hit_rts: Vec<f64>,
}

impl SignalCounts {
    fn tally(&mut self, outcome: Outcome, response_time_ms: f64) {
        match outcome {
            Outcome::Hit => {
                self.hits += 1;
                self.hit_rts.push(response_time_ms);
            }
            Outcome::Omission => self.omission_errors += 1,
            Outcome::CorrectRejection => self.correct_rejections += 1,
            Outcome::Commission => self.commission_errors += 1,
        }
    }
}

/// Build a shuffled sequence of `total` trials.
///
/// `floor(total * target_frequency)` trials show the target; the rest cycle
/// through the nine other digits so none is over-represented by more than
/// one occurrence.
pub fn build_sequence<R: Rng + ?Sized>(
    config: &SartConfig,
    total: u32,
    rng: &mut R,
) -> Vec<SartTrial> {
    let num_targets = ((total as f64 * config.target_frequency).floor() as u32).min(total);
    let non_targets: Vec<u8> = (0..10).filter(|d| *d != config.target_digit).collect();

    let mut digits: Vec<(u8, bool)> = Vec::with_capacity(total as usize);
    digits.extend((0..num_targets).map(|_| (config.target_digit, true)));
    digits.extend(
        (0..(total - num_targets) as usize).map(|i| (non_targets[i % non_targets.len()], false)),
    );
    digits.shuffle(rng);

    digits
        .into_iter()
        .map(|(digit, is_target)| SartTrial {
            digit,
            is_target,
            font_size: if config.vary_font_size {
                config
                    .font_sizes
                    .choose(&mut *rng)
                    .copied()
                    .unwrap_or(SART_FIXED_FONT_SIZE)
            } else {
                SART_FIXED_FONT_SIZE
            },
        })
        .collect()
}

pub struct Sart<R = StdRng> {
    config: SartConfig,
    rng: R,
    state: EngineState,
    sequence: Vec<SartTrial>,
    cursor: usize,
    counts: SignalCounts,
}

impl<R: Rng> Sart<R> {
    pub fn configure(options: &Options, rng: R) -> EngineResult<Self> {
        let config: SartConfig = parse_options(options)?;
        Self::new(config, rng)
    }

    pub fn new(config: SartConfig, mut rng: R) -> EngineResult<Self> {
        let config = config.validated()?;
        let sequence = build_sequence(&config, config.total_trials, &mut rng);
        tracing::debug!(
            total = sequence.len(),
            targets = sequence.iter().filter(|t| t.is_target).count(),
            "built SART sequence"
        );
        Ok(Self {
            config,
            rng,
            state: EngineState::new(),
            sequence,
            cursor: 0,
            counts: SignalCounts::default(),
        })
    }

    pub fn sequence(&self) -> &[SartTrial] {
        &self.sequence
    }

    pub fn counts(&self) -> &SignalCounts {
        &self.counts
    }

    fn stimulus(&self, trial: &SartTrial) -> Stimulus {
        Stimulus::Digit {
            digit: trial.digit,
            is_target: trial.is_target,
            font_size: trial.font_size,
            digit_display_ms: self.config.digit_display_ms,
            mask_duration_ms: self.config.mask_duration_ms,
            response_window_ms: self.config.response_window_ms,
        }
    }

    fn error_message(&self, outcome: Outcome) -> Option<String> {
        match outcome {
            Outcome::Commission => Some(format!(
                "Remember: don't respond to {}!",
                self.config.target_digit
            )),
            Outcome::Omission => Some("You should have responded.".to_string()),
            Outcome::Hit | Outcome::CorrectRejection => None,
        }
    }
}

impl<R: Rng + Send> Experiment for Sart<R> {
    fn kind(&self) -> ExperimentKind {
        ExperimentKind::Sart
    }

    fn configuration(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    fn instructions(&self) -> Vec<InstructionScreen> {
        let target = self.config.target_digit;
        let minutes = (self.config.total_trials as f64 * SECONDS_PER_TRIAL / 60.0) as u32;
        let go: Vec<u8> = [7, 9, 1].into_iter().filter(|d| *d != target).collect();
        let (go_a, go_b) = (go[0], go[1]);
        vec![
            InstructionScreen::text(
                "Sustained Attention Task",
                format!(
                    "This task measures your ability to maintain attention and control \
                     your responses over time.\n\nDuration: about {minutes} minutes."
                ),
            ),
            InstructionScreen::text(
                "Your Task",
                format!(
                    "Digits (0-9) will appear rapidly on the screen.\n\n\
                     Press the SPACEBAR for every digit EXCEPT {target}. \
                     When you see {target}, do not press anything.\n\n\
                     The digits come fast, but you must resist pressing when you see {target}."
                ),
            ),
            InstructionScreen::demo(
                "Practice Examples",
                format!(
                    "If you see {go_a}: press the spacebar.\n\
                     If you see {target}: do nothing.\n\
                     If you see {go_b}: press the spacebar."
                ),
            ),
            InstructionScreen::text(
                "Important Tips",
                "Stay focused: this task requires constant attention.\n\
                 Respond quickly, but not so fast that you make mistakes.\n\
                 Occasional errors are normal.\n\
                 Keep your finger ready over the spacebar.",
            ),
            InstructionScreen::text(
                "Ready?",
                format!(
                    "Press the spacebar for all digits except {target}.\n\
                     You'll do some practice trials first."
                ),
            ),
        ]
    }

    fn practice_trials(&mut self) -> Option<Vec<TrialSpec>> {
        if !self.state.enter_practice() {
            return None;
        }
        let practice = build_sequence(&self.config, PRACTICE_TRIALS, &mut self.rng);
        Some(
            practice
                .iter()
                .zip(1..)
                .map(|(trial, n)| TrialSpec {
                    trial_number: n,
                    trial_type: TrialType::Practice,
                    stimulus: self.stimulus(trial),
                    expected_response: Some(ExpectedResponse::Action(trial.expected_action())),
                    metadata: TrialMetadata::Sart {
                        is_target: trial.is_target,
                    },
                })
                .collect(),
        )
    }

    fn score_practice(
        &self,
        trial: &TrialSpec,
        response: &ResponseRecord,
    ) -> EngineResult<Feedback> {
        let correct = check_practice(trial, response)?;
        let is_target = matches!(trial.metadata, TrialMetadata::Sart { is_target: true });
        let message = if self.config.feedback_on_errors && !correct {
            self.error_message(Outcome::classify(is_target, response.responded()))
        } else {
            None
        };
        Ok(Feedback {
            correct,
            message,
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
        let trial = *self.sequence.get(self.cursor)?;
        self.cursor += 1;
        let stimulus = self.stimulus(&trial);
        Some(self.state.issue(
            stimulus,
            Some(ExpectedResponse::Action(trial.expected_action())),
            TrialMetadata::Sart {
                is_target: trial.is_target,
            },
        ))
    }

    fn record_response(&mut self, response: ResponseRecord) -> EngineResult<Feedback> {
        let scored = self.state.accept(response)?;
        let is_target = matches!(
            scored.trial.metadata,
            TrialMetadata::Sart { is_target: true }
        );
        let outcome = Outcome::classify(is_target, scored.response.responded());
        self.counts
            .tally(outcome, scored.response.response_time_ms);
        tracing::debug!(trial = scored.trial.trial_number, ?outcome, "SART response");

        if self.is_complete() {
            self.state.finish();
        }

        let correct = outcome.is_correct();
        let message = if self.config.feedback_on_errors && !correct {
            self.error_message(outcome)
        } else {
            None
        };
        Ok(Feedback {
            correct,
            message,
            continue_session: !self.is_complete(),
        })
    }

    fn is_complete(&self) -> bool {
        self.state.pending().is_none() && self.cursor >= self.sequence.len()
    }

    fn results(&self) -> ExperimentResults {
        let c = &self.counts;
        let total_targets = self.sequence.iter().filter(|t| t.is_target).count() as u32;
        let total_non_targets = self.config.total_trials - total_targets;

        let commission_rate = percent(c.commission_errors, total_targets);
        let omission_rate = percent(c.omission_errors, total_non_targets);
        let mean_rt = mean(&c.hit_rts);
        let std_rt = sample_std_dev(&c.hit_rts);
        let cv = if mean_rt > 0.0 { std_rt / mean_rt } else { 0.0 };

        ExperimentResults::Sart(SartResults {
            commission_errors: c.commission_errors,
            commission_error_rate: round_to(commission_rate, 2),
            omission_errors: c.omission_errors,
            omission_error_rate: round_to(omission_rate, 2),
            correct_rejections: c.correct_rejections,
            hits: c.hits,
            total_trials: self.config.total_trials,
            mean_reaction_time_ms: round_to(mean_rt, 2),
            std_reaction_time_ms: round_to(std_rt, 2),
            cv_reaction_time: round_to(cv, 3),
            interpretation: SartInterpretation::new(commission_rate, cv),
        })
    }

    fn state(&self) -> &EngineState {
        &self.state
    }
}
