use thiserror::Error;

/// Errors surfaced by experiment engines.
///
/// Running out of trials is not an error: `next_trial` returns `None`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An option is malformed or outside its valid range.
    #[error("invalid configuration for `{field}`: {reason}")]
    Configuration { field: String, reason: String },

    /// The response does not belong to the pending trial or is malformed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No engine is registered under this experiment type name.
    #[error("unknown experiment type: {0}")]
    UnknownExperiment(String),
}

impl EngineError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The caller sent something it can correct and resend.
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, EngineError::InvalidResponse(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
