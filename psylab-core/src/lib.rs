pub mod error;
pub mod instruction;
pub mod options;
pub mod phase;
pub mod schema;
pub mod stimulus;
pub mod trial;

pub use error::{EngineError, EngineResult};
pub use instruction::{InstructionScreen, ScreenKind};
pub use options::{Options, parse_options};
pub use phase::Phase;
pub use schema::{ConfigSchema, FieldKind, FieldSchema};
pub use stimulus::{InkColor, SpanDirection, Stimulus};
pub use trial::{
    ExpectedResponse, Feedback, GoAction, NO_RESPONSE, ResponseRecord, TrialMetadata, TrialSpec,
    TrialType,
};
