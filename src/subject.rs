//! A simulated participant for exercising engines without a display.

use psylab_core::{ExpectedResponse, GoAction, ResponseRecord, Stimulus, TrialSpec};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

const RESPOND_KEY: &str = "space";

pub struct SimulatedSubject {
    rng: StdRng,
    accuracy: f64,
    mean_rt_ms: f64,
    /// Keys the subject may press by mistake on key-response trials.
    keys: Vec<String>,
}

impl SimulatedSubject {
    pub fn new(rng: StdRng, accuracy: f64, mean_rt_ms: f64) -> Self {
        Self {
            rng,
            accuracy: accuracy.clamp(0.0, 1.0),
            mean_rt_ms: mean_rt_ms.max(1.0),
            keys: Vec::new(),
        }
    }

    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = keys;
        self
    }

    fn reaction_time(&mut self, trial: &TrialSpec) -> f64 {
        let jitter = self.rng.random_range(0.7..1.3);
        let scale = match &trial.stimulus {
            Stimulus::DigitSequence { length, .. } => *length as f64,
            _ => 1.0,
        };
        (self.mean_rt_ms * scale * jitter).round()
    }

    /// Answer `trial`, correctly with probability `accuracy`.
    pub fn respond(&mut self, trial: &TrialSpec) -> ResponseRecord {
        let correct = self.rng.random_bool(self.accuracy);
        let value = match &trial.expected_response {
            Some(expected) if correct => right_answer(expected),
            Some(expected) => self.wrong_answer(expected),
            None => None,
        };
        let rt = if value.is_some() {
            self.reaction_time(trial)
        } else {
            0.0
        };
        ResponseRecord::for_trial(trial, value, rt)
    }

    fn wrong_answer(&mut self, expected: &ExpectedResponse) -> Option<String> {
        match expected {
            ExpectedResponse::Digits(digits) => {
                // transpose the first two digits, or swap a lone digit
                let mut chars: Vec<char> = digits.chars().collect();
                match chars.len() {
                    0 => Some("0".to_string()),
                    1 => Some(if chars[0] == '0' { "1" } else { "0" }.to_string()),
                    _ => {
                        chars.swap(0, 1);
                        Some(chars.into_iter().collect())
                    }
                }
            }
            ExpectedResponse::Action(GoAction::Respond) => None,
            ExpectedResponse::Action(GoAction::Withhold) => Some(RESPOND_KEY.to_string()),
            ExpectedResponse::Key(key) => {
                let others: Vec<&String> = self
                    .keys
                    .iter()
                    .filter(|k| k.to_lowercase() != key.to_lowercase())
                    .collect();
                Some(
                    others
                        .choose(&mut self.rng)
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                )
            }
        }
    }
}

fn right_answer(expected: &ExpectedResponse) -> Option<String> {
    match expected {
        ExpectedResponse::Digits(digits) => Some(digits.clone()),
        ExpectedResponse::Action(GoAction::Respond) => Some(RESPOND_KEY.to_string()),
        ExpectedResponse::Action(GoAction::Withhold) => None,
        ExpectedResponse::Key(key) => Some(key.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_core::{InkColor, TrialMetadata, TrialType};
    use rand::SeedableRng;

    fn stroop_trial(key: &str) -> TrialSpec {
        TrialSpec {
            trial_number: 4,
            trial_type: TrialType::Test,
            stimulus: Stimulus::ColorWord {
                word: "GREEN".into(),
                ink_color: InkColor::Red,
            },
            expected_response: Some(ExpectedResponse::Key(key.into())),
            metadata: TrialMetadata::Stroop { congruent: false },
        }
    }

    #[test]
    fn perfect_subject_is_always_right() {
        let mut subject = SimulatedSubject::new(StdRng::seed_from_u64(1), 1.0, 400.0);
        for _ in 0..20 {
            let trial = stroop_trial("r");
            let response = subject.respond(&trial);
            assert!(trial.score(&response));
            assert!(response.response_time_ms >= 280.0);
        }
    }

    #[test]
    fn hopeless_subject_is_always_wrong() {
        let keys = ["r", "g", "b", "y"].map(String::from).to_vec();
        let mut subject =
            SimulatedSubject::new(StdRng::seed_from_u64(2), 0.0, 400.0).with_keys(keys);
        let trial = stroop_trial("r");
        for _ in 0..20 {
            assert!(!trial.score(&subject.respond(&trial)));
        }

        let digits = TrialSpec {
            expected_response: Some(ExpectedResponse::Digits("472".into())),
            ..stroop_trial("r")
        };
        assert_eq!(
            subject.respond(&digits).response_value.as_deref(),
            Some("742")
        );
    }
}
