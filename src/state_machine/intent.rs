//! Intent categories produced by the classifier

use super::state::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of communicative purposes an utterance can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Acknowledge,
    DontKnow,
    AnswerAttempt,
    ConceptRequest,
    LanguageSwitch,
    MetaQuestion,
    Comfort,
    Stop,
    Repeat,
    Unintelligible,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 10] = [
        IntentCategory::Acknowledge,
        IntentCategory::DontKnow,
        IntentCategory::AnswerAttempt,
        IntentCategory::ConceptRequest,
        IntentCategory::LanguageSwitch,
        IntentCategory::MetaQuestion,
        IntentCategory::Comfort,
        IntentCategory::Stop,
        IntentCategory::Repeat,
        IntentCategory::Unintelligible,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::Acknowledge => "acknowledge",
            IntentCategory::DontKnow => "dont_know",
            IntentCategory::AnswerAttempt => "answer_attempt",
            IntentCategory::ConceptRequest => "concept_request",
            IntentCategory::LanguageSwitch => "language_switch",
            IntentCategory::MetaQuestion => "meta_question",
            IntentCategory::Comfort => "comfort",
            IntentCategory::Stop => "stop",
            IntentCategory::Repeat => "repeat",
            IntentCategory::Unintelligible => "unintelligible",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a meta question asks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaTopic {
    Chapter,
    Topic,
    Subject,
    Progress,
}

/// Detail extracted alongside the category
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentDetail {
    #[default]
    None,
    /// Empty input or the silence marker
    NoSignal,
    /// The speech recognizer flagged the transcript as unusable
    Garbled,
    /// A bare "yes"/"haan" read as an answer while one is awaited
    Affirmation,
    Language {
        language: Language,
        topic: Option<String>,
    },
    Meta {
        topic: MetaTopic,
    },
}

/// A classified utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub category: IntentCategory,
    pub confidence: f32,
    pub detail: IntentDetail,
}

impl Intent {
    pub fn new(category: IntentCategory, confidence: f32) -> Self {
        Self {
            category,
            confidence,
            detail: IntentDetail::None,
        }
    }

    pub fn with_detail(mut self, detail: IntentDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Degraded result for anything the classifier could not make sense of
    pub fn unintelligible(detail: IntentDetail) -> Self {
        Self::new(IntentCategory::Unintelligible, 0.0).with_detail(detail)
    }

    pub fn language(&self) -> Option<Language> {
        match &self.detail {
            IntentDetail::Language { language, .. } => Some(*language),
            _ => None,
        }
    }

    pub fn meta_topic(&self) -> Option<MetaTopic> {
        match &self.detail {
            IntentDetail::Meta { topic } => Some(*topic),
            _ => None,
        }
    }
}
