//! Lookup from experiment type names to engines.

use std::fmt;
use std::str::FromStr;

use psylab_core::{ConfigSchema, EngineError, EngineResult, Options};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{DigitSpanConfig, SartConfig, StroopConfig};
use crate::contract::Experiment;
use crate::digit_span::DigitSpan;
use crate::sart::Sart;
use crate::stroop::Stroop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentKind {
    DigitSpan,
    Sart,
    Stroop,
}

impl ExperimentKind {
    pub const ALL: [ExperimentKind; 3] = [
        ExperimentKind::DigitSpan,
        ExperimentKind::Sart,
        ExperimentKind::Stroop,
    ];

    /// Registry name, as used on the wire and in session ids.
    pub fn name(&self) -> &'static str {
        match self {
            ExperimentKind::DigitSpan => "digit_span",
            ExperimentKind::Sart => "sart",
            ExperimentKind::Stroop => "stroop",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ExperimentKind::DigitSpan => "Digit Span",
            ExperimentKind::Sart => "Sustained Attention to Response Task",
            ExperimentKind::Stroop => "Stroop Color-Word Task",
        }
    }

    pub fn schema(&self) -> ConfigSchema {
        match self {
            ExperimentKind::DigitSpan => DigitSpanConfig::schema(),
            ExperimentKind::Sart => SartConfig::schema(),
            ExperimentKind::Stroop => StroopConfig::schema(),
        }
    }

    /// Declared defaults, before validation clamps anything.
    pub fn default_configuration(&self) -> Value {
        let value = match self {
            ExperimentKind::DigitSpan => serde_json::to_value(DigitSpanConfig::default()),
            ExperimentKind::Sart => serde_json::to_value(SartConfig::default()),
            ExperimentKind::Stroop => serde_json::to_value(StroopConfig::default()),
        };
        value.unwrap_or_default()
    }
}

impl fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExperimentKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ExperimentKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::UnknownExperiment(wanted.to_string()))
    }
}

/// Build a configured engine for `kind`.
///
/// The generator drives every random draw the engine makes, so a seeded
/// generator gives a reproducible run.
pub fn create<R>(kind: ExperimentKind, options: &Options, rng: R) -> EngineResult<Box<dyn Experiment>>
where
    R: Rng + Send + 'static,
{
    let engine: Box<dyn Experiment> = match kind {
        ExperimentKind::DigitSpan => Box::new(DigitSpan::configure(options, rng)?),
        ExperimentKind::Sart => Box::new(Sart::configure(options, rng)?),
        ExperimentKind::Stroop => Box::new(Stroop::configure(options, rng)?),
    };
    tracing::info!(experiment = kind.name(), "created experiment");
    Ok(engine)
}

/// [`create`] by registry name.
pub fn create_by_name<R>(name: &str, options: &Options, rng: R) -> EngineResult<Box<dyn Experiment>>
where
    R: Rng + Send + 'static,
{
    create(name.parse()?, options, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn names_round_trip() {
        for kind in ExperimentKind::ALL {
            assert_eq!(kind.name().parse::<ExperimentKind>().unwrap(), kind);
        }
        assert_eq!(" SART ".parse::<ExperimentKind>().unwrap(), ExperimentKind::Sart);
    }

    #[test]
    fn unknown_name() {
        let err = create_by_name("n_back", &Options::new(), StdRng::seed_from_u64(1))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::UnknownExperiment(ref name) if name == "n_back"));
    }

    #[test]
    fn every_kind_builds_with_defaults() {
        for kind in ExperimentKind::ALL {
            let engine = create(kind, &Options::new(), StdRng::seed_from_u64(2)).unwrap();
            assert_eq!(engine.kind(), kind);
            if kind != ExperimentKind::DigitSpan {
                assert_eq!(engine.configuration(), kind.default_configuration());
            }
            assert!(!engine.instructions().is_empty());
            assert_eq!(engine.configuration_schema(), kind.schema());
            assert_eq!(engine.default_configuration(), kind.default_configuration());
        }
    }

    #[test]
    fn schema_defaults_match_default_configuration() {
        for kind in ExperimentKind::ALL {
            let defaults = kind.default_configuration();
            let schema = kind.schema();
            for field in schema.basic.iter().chain(schema.advanced.iter()) {
                assert_eq!(
                    defaults.get(&field.name),
                    Some(&field.default),
                    "{kind}: {}",
                    field.name
                );
            }
        }
    }

    #[test]
    fn serde_uses_registry_names() {
        let json = serde_json::to_string(&ExperimentKind::DigitSpan).unwrap();
        assert_eq!(json, "\"digit_span\"");
    }
}
