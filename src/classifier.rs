//! Intent classification
//!
//! Cheap pattern checks decide most utterances. Only input none of them
//! recognize is handed to the model-backed classifier, whose failures
//! degrade to `Unintelligible` rather than aborting the turn.

mod language;
mod phrases;

pub use language::{detect_language_switch, detect_meta_question};

use crate::evaluator;
use crate::state_machine::{Intent, IntentCategory, IntentDetail, State};
use phrases::{ACKNOWLEDGE_RE, COMFORT_RE, CONCEPT_RE, DONT_KNOW_RE, REPEAT_RE, STOP_RE};
use serde::{Deserialize, Serialize};

/// Marker sent by the client when its silence timer fires
pub const SILENCE_MARKER: &str = "[silence]";

/// Utterances at most this long count as answers while one is awaited
const SHORT_ANSWER_WORDS: usize = 10;
/// Off-topic utterances at most this long are treated as noise
const NOISE_WORDS: usize = 3;

const PATTERN_CONFIDENCE: f32 = 0.95;
const NUMERIC_CONFIDENCE: f32 = 0.9;
const SHORT_ANSWER_CONFIDENCE: f32 = 0.6;
const FALLBACK_CONFIDENCE: f32 = 0.3;

/// Decoded speech handed over by the speech-to-text collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Recognizer confidence in `[0, 1]`
    pub confidence: f32,
    /// Set by the recognizer when the audio could not be decoded
    pub garbled: bool,
}

impl Transcript {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: 1.0,
            garbled: false,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn is_garbled(&self, threshold: f32) -> bool {
        self.garbled || self.confidence < threshold
    }
}

/// Outcome of the pattern-based pass
#[derive(Debug, Clone, PartialEq)]
pub enum FastPath {
    Decided(Intent),
    /// Nothing matched; ask the model-backed classifier
    NeedsModel,
}

/// Pattern-based classification. Pure and cheap.
///
/// Checks run in priority order: garbled, empty, stop, language switch,
/// comfort, meta question, repeat, don't-know, acknowledgement, concept
/// request, numeric answer, short answer while one is awaited.
pub fn classify_fast(
    text: &str,
    garbled: bool,
    state: State,
    topic_hint: Option<&str>,
) -> FastPath {
    let decided = |category, confidence| FastPath::Decided(Intent::new(category, confidence));

    if garbled {
        return FastPath::Decided(Intent::unintelligible(IntentDetail::Garbled));
    }

    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case(SILENCE_MARKER) {
        return FastPath::Decided(Intent::unintelligible(IntentDetail::NoSignal));
    }

    if STOP_RE.is_match(text) {
        return decided(IntentCategory::Stop, PATTERN_CONFIDENCE);
    }

    if let Some(language) = detect_language_switch(text) {
        return FastPath::Decided(
            Intent::new(IntentCategory::LanguageSwitch, PATTERN_CONFIDENCE).with_detail(
                IntentDetail::Language {
                    language,
                    topic: topic_hint.map(str::to_string),
                },
            ),
        );
    }

    if COMFORT_RE.is_match(text) {
        return decided(IntentCategory::Comfort, PATTERN_CONFIDENCE);
    }

    if let Some(topic) = detect_meta_question(text) {
        return FastPath::Decided(
            Intent::new(IntentCategory::MetaQuestion, PATTERN_CONFIDENCE)
                .with_detail(IntentDetail::Meta { topic }),
        );
    }

    if REPEAT_RE.is_match(text) {
        return decided(IntentCategory::Repeat, PATTERN_CONFIDENCE);
    }

    if DONT_KNOW_RE.is_match(text) {
        return decided(IntentCategory::DontKnow, PATTERN_CONFIDENCE);
    }

    let awaiting = state == State::AwaitingAnswer;

    if ACKNOWLEDGE_RE.is_match(text) {
        // A bare "yes" to a yes/no question is the answer itself
        if awaiting {
            return FastPath::Decided(
                Intent::new(IntentCategory::AnswerAttempt, PATTERN_CONFIDENCE)
                    .with_detail(IntentDetail::Affirmation),
            );
        }
        return decided(IntentCategory::Acknowledge, PATTERN_CONFIDENCE);
    }

    if CONCEPT_RE.is_match(text) {
        return decided(IntentCategory::ConceptRequest, PATTERN_CONFIDENCE);
    }

    let expects_answer = matches!(state, State::AwaitingAnswer | State::Hinting);
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    if has_digit || (expects_answer && evaluator::looks_numeric(text)) {
        return decided(IntentCategory::AnswerAttempt, NUMERIC_CONFIDENCE);
    }

    if awaiting && word_count(text) <= SHORT_ANSWER_WORDS {
        return decided(IntentCategory::AnswerAttempt, SHORT_ANSWER_CONFIDENCE);
    }

    FastPath::NeedsModel
}

/// Classification without a model: the fast path, then a word-count heuristic
#[allow(dead_code)] // For offline replay of stored transcripts
pub fn classify(text: &str, state: State, topic_hint: Option<&str>) -> Intent {
    match classify_fast(text, false, state, topic_hint) {
        FastPath::Decided(intent) => intent,
        FastPath::NeedsModel => heuristic_fallback(text),
    }
}

/// Used when no model is configured for ambiguous input
pub fn heuristic_fallback(text: &str) -> Intent {
    if word_count(text) <= NOISE_WORDS {
        Intent::unintelligible(IntentDetail::None)
    } else {
        Intent::new(IntentCategory::ConceptRequest, FALLBACK_CONFIDENCE)
    }
}

#[derive(Deserialize)]
struct ModelVerdict {
    category: IntentCategory,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse the model classifier's JSON reply.
///
/// Tolerates prose around the JSON object. Categories that need extracted
/// detail (language switch, meta question) are only trusted from the
/// pattern path, so the model cannot produce them.
pub fn parse_model_output(raw: &str) -> Option<Intent> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    let json = raw.get(start..=end)?;
    let verdict: ModelVerdict = serde_json::from_str(json).ok()?;
    if matches!(
        verdict.category,
        IntentCategory::LanguageSwitch | IntentCategory::MetaQuestion
    ) {
        return None;
    }
    let confidence = verdict.confidence.unwrap_or(0.5).clamp(0.0, 1.0);
    Some(Intent::new(verdict.category, confidence))
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
