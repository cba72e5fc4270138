use serde::{Deserialize, Serialize};

/// Lifecycle phase of a single experiment instance.
///
/// `Configured → Practice? → Test → Complete`. Practice is optional and is
/// never re-entered once the test phase has started.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Configured,
    Practice,
    Test,
    Complete,
}

impl Phase {
    /// Practice trials may still be handed out.
    pub fn allows_practice(&self) -> bool {
        matches!(self, Phase::Configured | Phase::Practice)
    }

    pub fn is_practice(&self) -> bool {
        matches!(self, Phase::Practice)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Phase::Complete)
    }
}
