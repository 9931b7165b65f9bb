//! Generation state machine

use serde::{Deserialize, Serialize};

/// State of a chat session's current turn.
///
/// ```text
/// Idle → Generating → { Completed | Cancelled | Failed } → Idle
/// ```
///
/// The terminal states are transient: they are reported to observers and
/// then the session settles back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
    Completed,
    Cancelled,
    Failed,
}

impl GenerationState {
    /// A turn is in flight until the session settles back to `Idle`.
    pub fn is_busy(&self) -> bool {
        !matches!(self, GenerationState::Idle)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationState::Completed | GenerationState::Cancelled | GenerationState::Failed
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Idle, Generating)
                | (Generating, Completed)
                | (Generating, Cancelled)
                | (Generating, Failed)
                | (Completed, Idle)
                | (Cancelled, Idle)
                | (Failed, Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::Generating => "generating",
            GenerationState::Completed => "completed",
            GenerationState::Cancelled => "cancelled",
            GenerationState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
