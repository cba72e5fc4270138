use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::stimulus::{SpanDirection, Stimulus};

/// Marker a presentation layer may send instead of omitting the value.
pub const NO_RESPONSE: &str = "no_response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialType {
    Practice,
    Test,
}

/// Expected go/no-go action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoAction {
    Respond,
    Withhold,
}

/// The answer a trial is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExpectedResponse {
    /// Exact digit string, e.g. `"472"`.
    Digits(String),
    Action(GoAction),
    /// Response key, compared case-insensitively.
    Key(String),
}

impl ExpectedResponse {
    pub fn matches(&self, response: &ResponseRecord) -> bool {
        match self {
            ExpectedResponse::Digits(expected) => {
                response.response_value.as_deref() == Some(expected.as_str())
            }
            ExpectedResponse::Action(GoAction::Respond) => response.responded(),
            ExpectedResponse::Action(GoAction::Withhold) => !response.responded(),
            ExpectedResponse::Key(expected) => response
                .response_value
                .as_deref()
                .is_some_and(|value| value.to_lowercase() == expected.to_lowercase()),
        }
    }
}

/// Engine bookkeeping carried alongside a trial and echoed back in its response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialMetadata {
    DigitSpan {
        span_length: u32,
        direction: SpanDirection,
        /// Attempts already made at this length before this trial.
        attempt: u32,
    },
    Sart {
        is_target: bool,
    },
    Stroop {
        congruent: bool,
    },
    #[default]
    Empty,
}

/// One trial as handed to the caller for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub trial_number: u32,
    pub trial_type: TrialType,
    pub stimulus: Stimulus,
    pub expected_response: Option<ExpectedResponse>,
    pub metadata: TrialMetadata,
}

impl TrialSpec {
    pub fn is_practice(&self) -> bool {
        self.trial_type == TrialType::Practice
    }

    /// Score a response against this trial's expected answer.
    ///
    /// Trials without an expected response are never correct.
    pub fn score(&self, response: &ResponseRecord) -> bool {
        self.expected_response
            .as_ref()
            .is_some_and(|expected| expected.matches(response))
    }
}

/// Subject input for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub trial_number: u32,
    #[serde(default)]
    pub response_value: Option<String>,
    pub response_time_ms: f64,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub metadata: TrialMetadata,
}

impl ResponseRecord {
    pub fn new(trial_number: u32, response_value: Option<String>, response_time_ms: f64) -> Self {
        Self {
            trial_number,
            response_value,
            response_time_ms,
            correct: None,
            metadata: TrialMetadata::Empty,
        }
    }

    /// Build a response to `trial`, echoing its metadata.
    pub fn for_trial(
        trial: &TrialSpec,
        response_value: Option<impl Into<String>>,
        response_time_ms: f64,
    ) -> Self {
        Self {
            trial_number: trial.trial_number,
            response_value: response_value.map(Into::into),
            response_time_ms,
            correct: None,
            metadata: trial.metadata.clone(),
        }
    }

    /// A response counts when a value is present, non-empty and not the
    /// explicit no-response marker.
    pub fn responded(&self) -> bool {
        match self.response_value.as_deref() {
            None => false,
            Some(value) => !value.is_empty() && value != NO_RESPONSE,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.response_time_ms.is_finite() || self.response_time_ms < 0.0 {
            return Err(EngineError::InvalidResponse(format!(
                "response_time_ms must be a non-negative number, got {}",
                self.response_time_ms
            )));
        }
        Ok(())
    }
}

/// What the engine tells the caller after scoring a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub correct: bool,
    pub message: Option<String>,
    #[serde(rename = "continue")]
    pub continue_session: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: Option<&str>) -> ResponseRecord {
        ResponseRecord::new(1, value.map(str::to_string), 420.0)
    }

    #[test]
    fn responded_ignores_blank_and_marker() {
        assert!(!response(None).responded());
        assert!(!response(Some("")).responded());
        assert!(!response(Some(NO_RESPONSE)).responded());
        assert!(response(Some(" ")).responded());
        assert!(response(Some("space")).responded());
    }

    #[test]
    fn digits_require_exact_match() {
        let expected = ExpectedResponse::Digits("472".into());
        assert!(expected.matches(&response(Some("472"))));
        assert!(!expected.matches(&response(Some("274"))));
        assert!(!expected.matches(&response(Some("472 "))));
        assert!(!expected.matches(&response(None)));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let expected = ExpectedResponse::Key("r".into());
        assert!(expected.matches(&response(Some("R"))));
        assert!(!expected.matches(&response(Some("g"))));

        let umlaut = ExpectedResponse::Key("Ä".into());
        assert!(umlaut.matches(&response(Some("ä"))));
        assert!(!umlaut.matches(&response(Some("a"))));
    }

    #[test]
    fn go_no_go_actions() {
        let go = ExpectedResponse::Action(GoAction::Respond);
        let no_go = ExpectedResponse::Action(GoAction::Withhold);
        assert!(go.matches(&response(Some("space"))));
        assert!(!go.matches(&response(None)));
        assert!(no_go.matches(&response(Some(NO_RESPONSE))));
        assert!(!no_go.matches(&response(Some("space"))));
    }

    #[test]
    fn negative_or_nan_times_are_rejected() {
        assert!(ResponseRecord::new(1, None, -1.0).validate().is_err());
        assert!(ResponseRecord::new(1, None, f64::NAN).validate().is_err());
        assert!(ResponseRecord::new(1, None, 0.0).validate().is_ok());
    }

    #[test]
    fn feedback_uses_continue_key() {
        let fb = Feedback {
            correct: true,
            message: None,
            continue_session: false,
        };
        let json = serde_json::to_value(&fb).unwrap();
        assert_eq!(json["continue"], false);
    }
}
