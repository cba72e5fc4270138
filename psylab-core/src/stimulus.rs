use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the presentation layer shows for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stimulus {
    /// Digits shown one at a time, then recalled.
    DigitSequence {
        digits: Vec<u8>,
        length: u32,
        direction: SpanDirection,
        digit_display_time_ms: u64,
        inter_digit_interval_ms: u64,
    },
    /// A single go/no-go digit followed by a mask.
    Digit {
        digit: u8,
        is_target: bool,
        font_size: u32,
        digit_display_ms: u64,
        mask_duration_ms: u64,
        response_window_ms: u64,
    },
    /// A color name printed in an ink color.
    ColorWord { word: String, ink_color: InkColor },
}

/// Recall order for a digit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanDirection {
    Forward,
    Backward,
}

impl SpanDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanDirection::Forward => "forward",
            SpanDirection::Backward => "backward",
        }
    }
}

impl fmt::Display for SpanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four Stroop colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl InkColor {
    pub const ALL: [InkColor; 4] = [
        InkColor::Red,
        InkColor::Green,
        InkColor::Blue,
        InkColor::Yellow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InkColor::Red => "red",
            InkColor::Green => "green",
            InkColor::Blue => "blue",
            InkColor::Yellow => "yellow",
        }
    }

    /// The printed word, upper case.
    pub fn word(&self) -> String {
        self.name().to_uppercase()
    }

    /// Default response key: the color's initial.
    pub fn default_key(&self) -> &'static str {
        &self.name()[..1]
    }
}

impl fmt::Display for InkColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InkColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(InkColor::Red),
            "green" => Ok(InkColor::Green),
            "blue" => Ok(InkColor::Blue),
            "yellow" => Ok(InkColor::Yellow),
            other => Err(format!("unknown color '{other}'")),
        }
    }
}
