//! Dialogue state and the per-session context

use super::action::Effect;
use super::transition::{Target, Transition, TransitionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Wrong answers remembered per question
const MAX_REMEMBERED_ATTEMPTS: usize = 3;

/// Dialogue states. Closed: there is no fallback or unknown variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Greeting,
    Teaching,
    AwaitingAnswer,
    Hinting,
    /// The full solution has been revealed
    Explaining,
    /// Emotional support; no teaching or testing happens here
    Comfort,
    SessionEnd,
}

impl State {
    pub const ALL: [State; 7] = [
        State::Greeting,
        State::Teaching,
        State::AwaitingAnswer,
        State::Hinting,
        State::Explaining,
        State::Comfort,
        State::SessionEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            State::Greeting => "greeting",
            State::Teaching => "teaching",
            State::AwaitingAnswer => "awaiting_answer",
            State::Hinting => "hinting",
            State::Explaining => "explaining",
            State::Comfort => "comfort",
            State::SessionEnd => "session_end",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, State::SessionEnd)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown dialogue state: {0:?}")]
pub struct UnknownState(pub String);

impl FromStr for State {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// Output language preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Roman-script Hindi mixed with English
    #[default]
    Hinglish,
    /// Devanagari Hindi
    Hindi,
    English,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Hinglish, Language::Hindi, Language::English];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Hinglish => "hinglish",
            Language::Hindi => "hindi",
            Language::English => "english",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question supplied by the content source. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub answer: String,
    #[serde(default)]
    pub alternates: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub solution: String,
    pub topic: String,
    /// Teaching material in presentation order, indexed by reteach count
    #[serde(default)]
    pub teaching: Vec<String>,
}

impl Question {
    /// Hint for a 1-based level, clamped to the last available hint
    pub fn hint(&self, level: u8) -> Option<&str> {
        let index = usize::from(level.max(1)) - 1;
        self.hints
            .get(index)
            .or_else(|| self.hints.last())
            .map(String::as_str)
    }

    /// Teaching material by index, clamped to the last entry
    pub fn material(&self, index: u8) -> Option<&str> {
        self.teaching
            .get(usize::from(index))
            .or_else(|| self.teaching.last())
            .map(String::as_str)
    }
}

/// Mutable per-session record, owned by exactly one runtime at a time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub state: State,
    /// Changes only on an explicit language switch
    pub language: Language,
    pub topic: String,
    pub reteach_count: u8,
    pub hint_level: u8,
    /// Consecutive turns classified as unintelligible
    pub unclear_count: u8,
    pub questions_asked: u32,
    pub attempts: u32,
    pub score: u32,
    pub question: Option<Question>,
    #[serde(default)]
    pub asked_ids: Vec<String>,
    /// State interrupted by a comfort turn
    pub resume_state: Option<State>,
    /// Recent wrong answers to the active question, oldest first
    #[serde(default)]
    pub wrong_attempts: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(
        session_id: impl Into<String>,
        topic: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state: State::Greeting,
            language: Language::default(),
            topic: topic.into(),
            reteach_count: 0,
            hint_level: 0,
            unclear_count: 0,
            questions_asked: 0,
            attempts: 0,
            score: 0,
            question: None,
            asked_ids: Vec::new(),
            resume_state: None,
            wrong_attempts: Vec::new(),
            started_at: now,
            last_activity: now,
        }
    }

    /// Time since the session started, as of the last recorded activity
    pub fn elapsed(&self) -> Duration {
        (self.last_activity - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Apply a resolved transition's effects and move to its target state.
    ///
    /// `LoadNextQuestion` only drops the current question; the caller
    /// fetches the replacement and hands it to [`Self::install_question`].
    pub fn apply(&mut self, transition: &Transition) -> Result<(), TransitionError> {
        let Target::Resolved(next) = transition.target else {
            return Err(TransitionError::PendingVerdict {
                state: self.state,
            });
        };

        let mut unclear = false;
        for effect in &transition.effects {
            match effect {
                Effect::IncrementReteach => {
                    self.reteach_count = self.reteach_count.saturating_add(1);
                }
                Effect::ResetReteach => self.reteach_count = 0,
                Effect::StoreLanguage(language) => self.language = *language,
                Effect::SetHintLevel(level) => self.hint_level = *level,
                Effect::IncrementScore => self.score += 1,
                Effect::CountAttempt => self.attempts += 1,
                Effect::LoadNextQuestion => self.question = None,
                Effect::RememberResume(state) => self.resume_state = Some(*state),
                Effect::ClearResume => self.resume_state = None,
                Effect::CountUnclear => unclear = true,
            }
        }

        self.unclear_count = if unclear {
            self.unclear_count.saturating_add(1)
        } else {
            0
        };
        self.state = next;
        Ok(())
    }

    pub fn install_question(&mut self, question: Question) {
        self.asked_ids.push(question.id.clone());
        self.questions_asked += 1;
        self.hint_level = 0;
        self.wrong_attempts.clear();
        self.question = Some(question);
    }

    /// Remember a wrong answer to the active question, keeping the latest few
    pub fn note_wrong_attempt(&mut self, utterance: &str) {
        if self.wrong_attempts.len() == MAX_REMEMBERED_ATTEMPTS {
            self.wrong_attempts.remove(0);
        }
        self.wrong_attempts.push(utterance.trim().to_string());
    }

    /// Snapshot consistency check used when loading from storage
    pub fn is_consistent_with(&self, state: State) -> bool {
        self.state == state
    }
}
