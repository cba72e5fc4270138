//! Typed per-experiment configuration.
//!
//! Every struct deserializes from raw [`Options`](psylab_core::Options) with
//! `#[serde(default)]`, then goes through `validated()` before an engine is
//! built. Out-of-range values fail with `EngineError::Configuration`, except
//! the digit span `max_length`, which is clamped to the digit pool size.

use std::collections::{BTreeMap, HashSet};

use psylab_core::{
    ConfigSchema, EngineError, EngineResult, FieldKind, FieldSchema, InkColor, SpanDirection,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of distinct digits a span sequence can draw from.
pub const DIGIT_POOL: u32 = 10;

/// Integer options as form hosts post them: `40` or `40.0`.
mod whole {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        let value = Value::deserialize(deserializer)?;
        let whole = match &value {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            _ => None,
        };
        let whole = whole.ok_or_else(|| {
            D::Error::custom(format!("expected a non-negative whole number, got {value}"))
        })?;
        T::try_from(whole).map_err(|_| D::Error::custom(format!("{whole} is out of range")))
    }
}

/// Which recall directions a digit span session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanMode {
    #[default]
    Forward,
    Backward,
    /// Forward first, then backward.
    Both,
}

impl SpanMode {
    pub fn first_direction(&self) -> SpanDirection {
        match self {
            SpanMode::Backward => SpanDirection::Backward,
            SpanMode::Forward | SpanMode::Both => SpanDirection::Forward,
        }
    }

    pub fn includes(&self, direction: SpanDirection) -> bool {
        match self {
            SpanMode::Both => true,
            SpanMode::Forward => direction == SpanDirection::Forward,
            SpanMode::Backward => direction == SpanDirection::Backward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitSpanConfig {
    pub direction: SpanMode,
    #[serde(deserialize_with = "whole::deserialize")]
    pub starting_length: u32,
    #[serde(deserialize_with = "whole::deserialize")]
    pub max_length: u32,
    #[serde(deserialize_with = "whole::deserialize")]
    pub trials_per_length: u32,
    #[serde(deserialize_with = "whole::deserialize")]
    pub failure_threshold: u32,
    #[serde(deserialize_with = "whole::deserialize")]
    pub digit_display_time_ms: u64,
    #[serde(deserialize_with = "whole::deserialize")]
    pub inter_digit_interval_ms: u64,
    pub feedback_enabled: bool,
}

impl Default for DigitSpanConfig {
    fn default() -> Self {
        Self {
            direction: SpanMode::Forward,
            starting_length: 3,
            max_length: 12,
            trials_per_length: 2,
            failure_threshold: 2,
            digit_display_time_ms: 1000,
            inter_digit_interval_ms: 200,
            feedback_enabled: true,
        }
    }
}

impl DigitSpanConfig {
    pub fn validated(mut self) -> EngineResult<Self> {
        if !(1..=DIGIT_POOL).contains(&self.starting_length) {
            return Err(EngineError::config(
                "starting_length",
                format!(
                    "must be in 1..={DIGIT_POOL}, got {}",
                    self.starting_length
                ),
            ));
        }
        if self.max_length < self.starting_length {
            return Err(EngineError::config(
                "max_length",
                format!(
                    "must be >= starting_length ({}), got {}",
                    self.starting_length, self.max_length
                ),
            ));
        }
        if self.max_length > DIGIT_POOL {
            tracing::warn!(
                requested = self.max_length,
                clamped = DIGIT_POOL,
                "max_length exceeds distinct digits available, clamping"
            );
            self.max_length = DIGIT_POOL;
        }
        if self.trials_per_length == 0 {
            return Err(EngineError::config("trials_per_length", "must be >= 1"));
        }
        if self.failure_threshold == 0 {
            return Err(EngineError::config("failure_threshold", "must be >= 1"));
        }
        Ok(self)
    }

    pub fn schema() -> ConfigSchema {
        let d = Self::default();
        ConfigSchema {
            basic: vec![
                FieldSchema::new(
                    "direction",
                    FieldKind::Select,
                    "Direction",
                    "forward",
                    "Order in which digits should be recalled",
                )
                .option("forward", "Forward Only")
                .option("backward", "Backward Only")
                .option("both", "Both (Forward then Backward)"),
                FieldSchema::new(
                    "starting_length",
                    FieldKind::Number,
                    "Starting Sequence Length",
                    d.starting_length,
                    "Number of digits in first trial",
                )
                .range(2.0, 6.0),
                FieldSchema::new(
                    "feedback_enabled",
                    FieldKind::Boolean,
                    "Show Feedback",
                    d.feedback_enabled,
                    "Tell participants if they were correct",
                ),
            ],
            advanced: vec![
                FieldSchema::new(
                    "max_length",
                    FieldKind::Number,
                    "Maximum Sequence Length",
                    d.max_length,
                    "Stop test if this length reached (at most 10 distinct digits)",
                )
                .range(5.0, 20.0),
                FieldSchema::new(
                    "trials_per_length",
                    FieldKind::Number,
                    "Trials Per Length",
                    d.trials_per_length,
                    "How many attempts at each sequence length",
                )
                .range(1.0, 3.0),
                FieldSchema::new(
                    "failure_threshold",
                    FieldKind::Number,
                    "Consecutive Failures to Stop",
                    d.failure_threshold,
                    "Stop after this many failed lengths in a row",
                )
                .range(1.0, 3.0),
                FieldSchema::new(
                    "digit_display_time_ms",
                    FieldKind::Number,
                    "Digit Display Time (ms)",
                    d.digit_display_time_ms,
                    "How long each digit appears",
                )
                .range(500.0, 2000.0)
                .step(100.0),
                FieldSchema::new(
                    "inter_digit_interval_ms",
                    FieldKind::Number,
                    "Blank Between Digits (ms)",
                    d.inter_digit_interval_ms,
                    "Pause between digits",
                )
                .range(0.0, 500.0)
                .step(50.0),
            ],
        }
    }
}

/// Font size used when sizes are not varied.
pub const SART_FIXED_FONT_SIZE: u32 = 72;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SartConfig {
    /// The NO-GO digit.
    #[serde(deserialize_with = "whole::deserialize")]
    pub target_digit: u8,
    #[serde(deserialize_with = "whole::deserialize")]
    pub total_trials: u32,
    pub target_frequency: f64,
    #[serde(deserialize_with = "whole::deserialize")]
    pub digit_display_ms: u64,
    #[serde(deserialize_with = "whole::deserialize")]
    pub mask_duration_ms: u64,
    #[serde(deserialize_with = "whole::deserialize")]
    pub response_window_ms: u64,
    pub vary_font_size: bool,
    pub font_sizes: Vec<u32>,
    pub feedback_on_errors: bool,
}

impl Default for SartConfig {
    fn default() -> Self {
        Self {
            target_digit: 3,
            total_trials: 225,
            target_frequency: 0.11,
            digit_display_ms: 250,
            mask_duration_ms: 900,
            response_window_ms: 900,
            vary_font_size: true,
            font_sizes: vec![48, 72, 94, 100, 120],
            feedback_on_errors: false,
        }
    }
}

impl SartConfig {
    pub fn validated(self) -> EngineResult<Self> {
        if self.target_digit > 9 {
            return Err(EngineError::config(
                "target_digit",
                format!("must be a single digit, got {}", self.target_digit),
            ));
        }
        if self.total_trials == 0 {
            return Err(EngineError::config("total_trials", "must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.target_frequency) {
            return Err(EngineError::config(
                "target_frequency",
                format!("must be in [0, 1], got {}", self.target_frequency),
            ));
        }
        if self.vary_font_size && self.font_sizes.is_empty() {
            return Err(EngineError::config(
                "font_sizes",
                "must not be empty when vary_font_size is set",
            ));
        }
        Ok(self)
    }

    pub fn schema() -> ConfigSchema {
        let d = Self::default();
        ConfigSchema {
            basic: vec![
                FieldSchema::new(
                    "target_digit",
                    FieldKind::Number,
                    "Target Digit (NO-GO)",
                    d.target_digit,
                    "The digit participants should NOT respond to",
                )
                .range(0.0, 9.0),
                FieldSchema::new(
                    "total_trials",
                    FieldKind::Number,
                    "Total Number of Trials",
                    d.total_trials,
                    "More trials = longer test but more reliable data",
                )
                .range(50.0, 500.0)
                .step(25.0),
                FieldSchema::new(
                    "feedback_on_errors",
                    FieldKind::Boolean,
                    "Show Feedback on Errors",
                    d.feedback_on_errors,
                    "Tell participants when they make mistakes (not typical for SART)",
                ),
            ],
            advanced: vec![
                FieldSchema::new(
                    "target_frequency",
                    FieldKind::Number,
                    "Target Frequency (proportion)",
                    d.target_frequency,
                    "Proportion of trials that are NO-GO (typical: 0.11)",
                )
                .range(0.05, 0.30)
                .step(0.01),
                FieldSchema::new(
                    "digit_display_ms",
                    FieldKind::Number,
                    "Digit Display Time (ms)",
                    d.digit_display_ms,
                    "How long each digit appears",
                )
                .range(100.0, 1000.0)
                .step(50.0),
                FieldSchema::new(
                    "mask_duration_ms",
                    FieldKind::Number,
                    "Mask/Blank Duration (ms)",
                    d.mask_duration_ms,
                    "Blank screen after digit (typical: 900ms)",
                )
                .range(500.0, 2000.0)
                .step(100.0),
                FieldSchema::new(
                    "response_window_ms",
                    FieldKind::Number,
                    "Response Window (ms)",
                    d.response_window_ms,
                    "Time allowed for response",
                )
                .range(500.0, 2000.0)
                .step(100.0),
                FieldSchema::new(
                    "vary_font_size",
                    FieldKind::Boolean,
                    "Vary Font Size",
                    d.vary_font_size,
                    "Randomize digit size to prevent habituation",
                ),
            ],
        }
    }
}

/// Ink color to response key.
///
/// Accepts an object or a JSON string holding one. Entries are merged over
/// the r/g/b/y defaults; color names are case-insensitive and unknown colors
/// are skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Keymap(BTreeMap<InkColor, String>);

impl Default for Keymap {
    fn default() -> Self {
        Keymap(
            InkColor::ALL
                .iter()
                .map(|c| (*c, c.default_key().to_string()))
                .collect(),
        )
    }
}

impl Keymap {
    pub fn key(&self, color: InkColor) -> &str {
        self.0
            .get(&color)
            .map(String::as_str)
            .unwrap_or_else(|| color.default_key())
    }

    pub fn iter(&self) -> impl Iterator<Item = (InkColor, &str)> {
        self.0.iter().map(|(c, k)| (*c, k.as_str()))
    }

    pub fn validate(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for (color, key) in self.iter() {
            if key.is_empty() {
                return Err(EngineError::config(
                    "keymap",
                    format!("empty key for {color}"),
                ));
            }
            if !seen.insert(key.to_lowercase()) {
                return Err(EngineError::config(
                    "keymap",
                    format!("key '{key}' is assigned to more than one color"),
                ));
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Keymap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = match Value::deserialize(deserializer)? {
            Value::Object(map) => map,
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                _ => return Err(D::Error::custom("keymap string must hold a JSON object")),
            },
            _ => return Err(D::Error::custom("keymap must map color names to keys")),
        };

        let mut keymap = Keymap::default();
        for (name, key) in entries {
            let Ok(color) = name.parse::<InkColor>() else {
                tracing::warn!(color = %name, "ignoring keymap entry for unknown color");
                continue;
            };
            let key = match key {
                Value::String(s) => s,
                other => other.to_string(),
            };
            keymap.0.insert(color, key);
        }
        Ok(keymap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StroopConfig {
    #[serde(deserialize_with = "whole::deserialize")]
    pub total_trials: u32,
    /// Fraction of trials whose word names its own ink color.
    pub congruent_ratio: f64,
    pub keymap: Keymap,
}

impl Default for StroopConfig {
    fn default() -> Self {
        Self {
            total_trials: 40,
            congruent_ratio: 0.5,
            keymap: Keymap::default(),
        }
    }
}

impl StroopConfig {
    pub fn validated(self) -> EngineResult<Self> {
        if self.total_trials == 0 {
            return Err(EngineError::config("total_trials", "must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.congruent_ratio) {
            return Err(EngineError::config(
                "congruent_ratio",
                format!("must be in [0, 1], got {}", self.congruent_ratio),
            ));
        }
        self.keymap.validate()?;
        Ok(self)
    }

    pub fn schema() -> ConfigSchema {
        let d = Self::default();
        let keymap = serde_json::to_value(&d.keymap).unwrap_or_default();
        ConfigSchema {
            basic: vec![
                FieldSchema::new(
                    "total_trials",
                    FieldKind::Number,
                    "Total Trials",
                    d.total_trials,
                    "Number of test trials",
                )
                .range(10.0, 400.0)
                .step(10.0),
                FieldSchema::new(
                    "congruent_ratio",
                    FieldKind::Number,
                    "Congruent Ratio (0-1)",
                    d.congruent_ratio,
                    "Share of trials where the word matches its ink",
                )
                .range(0.0, 1.0)
                .step(0.1),
            ],
            advanced: vec![FieldSchema::new(
                "keymap",
                FieldKind::Keymap,
                "Keymap (color -> key)",
                keymap,
                "Response key for each ink color",
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_core::{options::options_from_json, parse_options};

    fn digit_span(json: &str) -> EngineResult<DigitSpanConfig> {
        parse_options::<DigitSpanConfig>(&options_from_json(json)?)?.validated()
    }

    fn stroop(json: &str) -> EngineResult<StroopConfig> {
        parse_options::<StroopConfig>(&options_from_json(json)?)?.validated()
    }

    #[test]
    fn digit_span_defaults_clamp_max_length() {
        let config = digit_span("{}").unwrap();
        assert_eq!(config.starting_length, 3);
        assert_eq!(config.max_length, DIGIT_POOL);
        assert_eq!(config.direction, SpanMode::Forward);
    }

    #[test]
    fn digit_span_rejects_out_of_range() {
        assert!(digit_span(r#"{"starting_length": 0}"#).is_err());
        assert!(digit_span(r#"{"starting_length": 11}"#).is_err());
        assert!(digit_span(r#"{"starting_length": 6, "max_length": 5}"#).is_err());
        assert!(digit_span(r#"{"trials_per_length": 0}"#).is_err());
        assert!(digit_span(r#"{"direction": "sideways"}"#).is_err());
    }

    #[test]
    fn integer_options_accept_whole_floats() {
        let config = digit_span(r#"{"starting_length": 4.0, "digit_display_time_ms": 800.0}"#)
            .unwrap();
        assert_eq!(config.starting_length, 4);
        assert_eq!(config.digit_display_time_ms, 800);

        let config = stroop(r#"{"total_trials": 40.0}"#).unwrap();
        assert_eq!(config.total_trials, 40);

        assert!(stroop(r#"{"total_trials": 40.5}"#).is_err());
        assert!(stroop(r#"{"total_trials": -3}"#).is_err());
        assert!(stroop(r#"{"total_trials": "forty"}"#).is_err());

        let sart: SartConfig =
            parse_options(&options_from_json(r#"{"target_digit": 7.0}"#).unwrap()).unwrap();
        assert_eq!(sart.target_digit, 7);
        assert!(
            parse_options::<SartConfig>(&options_from_json(r#"{"target_digit": 300}"#).unwrap())
                .is_err()
        );
    }

    #[test]
    fn sart_validation() {
        let ok = SartConfig::default().validated().unwrap();
        assert_eq!(ok.total_trials, 225);

        let bad_digit = SartConfig {
            target_digit: 12,
            ..SartConfig::default()
        };
        assert!(bad_digit.validated().is_err());

        let bad_freq = SartConfig {
            target_frequency: 1.5,
            ..SartConfig::default()
        };
        assert!(bad_freq.validated().is_err());

        let no_fonts = SartConfig {
            font_sizes: vec![],
            ..SartConfig::default()
        };
        assert!(no_fonts.validated().is_err());
    }

    #[test]
    fn keymap_merges_over_defaults() {
        let config = stroop(r#"{"keymap": {"RED": "j", "purple": "p"}}"#).unwrap();
        assert_eq!(config.keymap.key(InkColor::Red), "j");
        assert_eq!(config.keymap.key(InkColor::Green), "g");
    }

    #[test]
    fn keymap_accepts_json_string() {
        let config = stroop(r#"{"keymap": "{\"blue\": \"k\"}"}"#).unwrap();
        assert_eq!(config.keymap.key(InkColor::Blue), "k");
        assert!(stroop(r#"{"keymap": "not json"}"#).is_err());
    }

    #[test]
    fn keymap_rejects_duplicate_keys() {
        let err = stroop(r#"{"keymap": {"red": "g"}}"#).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { ref field, .. } if field == "keymap"));
    }

    #[test]
    fn schemas_expose_defaults() {
        let schema = SartConfig::schema();
        assert_eq!(schema.field("target_digit").unwrap().default, 3);
        let schema = StroopConfig::schema();
        assert_eq!(schema.field("keymap").unwrap().default["yellow"], "y");
    }
}
