use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenKind {
    Text,
    InteractiveDemo,
}

/// One page of participant instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionScreen {
    pub kind: ScreenKind,
    pub title: String,
    pub content: String,
    /// Auto-advance after this long; `None` waits for the participant.
    pub duration_ms: Option<u64>,
}

impl InstructionScreen {
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ScreenKind::Text,
            title: title.into(),
            content: content.into(),
            duration_ms: None,
        }
    }

    pub fn demo(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ScreenKind::InteractiveDemo,
            ..Self::text(title, content)
        }
    }
}
