//! Participant scores and the small statistics they need.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SpanMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "experiment_type", rename_all = "snake_case")]
pub enum ExperimentResults {
    DigitSpan(DigitSpanResults),
    Sart(SartResults),
    Stroop(StroopResults),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitSpanResults {
    /// Longest correctly recalled length in the active direction.
    pub max_span_achieved: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_span: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backward_span: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_span: Option<u32>,
    pub total_trials: usize,
    pub direction_mode: SpanMode,
    /// Span length to proportion correct.
    pub accuracy_by_length: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    Low,
    Moderate,
    High,
}

impl Band {
    /// Commission error rate, in percent.
    pub fn commission(rate: f64) -> Self {
        if rate < 30.0 {
            Band::Low
        } else if rate < 50.0 {
            Band::Moderate
        } else {
            Band::High
        }
    }

    /// Reaction time coefficient of variation.
    pub fn variability(cv: f64) -> Self {
        if cv < 0.20 {
            Band::Low
        } else if cv < 0.30 {
            Band::Moderate
        } else {
            Band::High
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Band::Low => "Low",
            Band::Moderate => "Moderate",
            Band::High => "High",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SartInterpretation {
    pub commission_errors: Band,
    pub rt_variability: Band,
    pub summary: String,
}

impl SartInterpretation {
    pub fn new(commission_rate: f64, cv: f64) -> Self {
        let commission_errors = Band::commission(commission_rate);
        let rt_variability = Band::variability(cv);
        Self {
            commission_errors,
            rt_variability,
            summary: format!(
                "Commission errors: {commission_errors}, RT variability: {rt_variability}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SartResults {
    pub commission_errors: u32,
    pub commission_error_rate: f64,
    pub omission_errors: u32,
    pub omission_error_rate: f64,
    pub correct_rejections: u32,
    pub hits: u32,
    pub total_trials: u32,
    pub mean_reaction_time_ms: f64,
    pub std_reaction_time_ms: f64,
    pub cv_reaction_time: f64,
    pub interpretation: SartInterpretation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StroopResults {
    pub accuracy: f64,
    pub mean_rt_ms: f64,
    pub trials_attempted: usize,
    pub congruent_accuracy: f64,
    pub incongruent_accuracy: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Percentage of `part` in `whole`, zero when `whole` is zero.
pub fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
