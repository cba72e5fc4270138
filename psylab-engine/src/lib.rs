pub mod config;
pub mod contract;
pub mod digit_span;
pub mod registry;
pub mod results;
pub mod sart;
pub mod session;
pub mod state;
pub mod stroop;

pub use config::{DigitSpanConfig, Keymap, SartConfig, SpanMode, StroopConfig};
pub use contract::Experiment;
pub use digit_span::DigitSpan;
pub use registry::{ExperimentKind, create, create_by_name};
pub use results::{
    Band, DigitSpanResults, ExperimentResults, SartInterpretation, SartResults, StroopResults,
};
pub use sart::Sart;
pub use session::{
    MemorySink, NextStep, PersistenceSink, SessionError, SessionRegistry, SessionResult,
    StartedSession,
};
pub use state::{EngineState, Progress, StateSnapshot};
pub use stroop::Stroop;
