//! Teaching actions and context effects carried by a transition

use super::intent::MetaTopic;
use super::state::{Language, State};
use serde::{Deserialize, Serialize};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Stopped,
    TimeLimit,
    Completed,
    ContentExhausted,
}

/// The teaching action chosen for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Greet,
    StartTeaching,
    /// Present the concept again using different material
    Reteach { material_index: u8 },
    /// `forced` is set when the reteach cap pushed the student forward
    AskQuestion { forced: bool },
    RereadQuestion,
    GiveHint { level: u8 },
    /// Acknowledge the part that was right and point at what is missing
    PartialGuidance,
    RevealSolution,
    AdvanceQuestion,
    Comfort,
    Resume { to: State },
    AnswerMeta { topic: MetaTopic },
    ReissueInLanguage { language: Language },
    AskRepeat { attempt: u8 },
    EndSession { reason: EndReason },
    Farewell,
    /// Placeholder while a verdict is outstanding
    Evaluate,
}

impl Action {
    /// Actions answered from a fixed template rather than the generator
    pub fn is_templated(self) -> bool {
        matches!(
            self,
            Action::AnswerMeta { .. }
                | Action::AskRepeat { .. }
                | Action::Farewell
                | Action::EndSession { .. }
        )
    }
}

/// Counter and context changes applied when a transition commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Effect {
    IncrementReteach,
    ResetReteach,
    StoreLanguage(Language),
    SetHintLevel(u8),
    IncrementScore,
    CountAttempt,
    /// Drop the active question; the runtime fetches the next one
    LoadNextQuestion,
    RememberResume(State),
    ClearResume,
    /// Absence of this effect resets the consecutive-unclear counter
    CountUnclear,
}
