//! Individual enforcement checks
//!
//! Repairing rules return the rewritten text when they fire; detecting rules
//! only report. A rule that does not fire never touches the text.

use crate::config::EnforcerLimits;
use crate::speech;
use crate::state_machine::Language;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const PRAISE: &[&str] = &[
    "शाबाश",
    "बहुत अच्छा",
    "बहुत बढ़िया",
    "एकदम सही",
    "बिल्कुल सही",
    "वाह",
    "shabash",
    "shabaash",
    "bahut accha",
    "bahut achha",
    "bahut acha",
    "bahut badhiya",
    "ekdam sahi",
    "bilkul sahi",
    "sahi jawab",
    "wah",
    "excellent",
    "perfect",
    "great job",
    "good job",
    "very good",
    "well done",
    "fantastic",
    "amazing",
    "brilliant",
    "awesome",
];

const TEACHING_MARKERS: &[&str] = &[
    "matlab",
    "for example",
    "jaise ki",
    "yaad rakhiye",
    "yaad rakho",
    "note karo",
    "formula",
    "rule",
    "मतलब",
    "जैसे कि",
    "याद रखिए",
];

const REFERENCE_MARKERS: &[&str] = &[
    "aapne",
    "tumne",
    "you said",
    "your answer",
    "aapka answer",
    "bola",
    "kaha",
    "आपने",
    "आपका",
    "तुमने",
];

/// Token overlap above which a reply counts as a repeat
const REPETITION_OVERLAP: f64 = 0.8;
/// Share of Devanagari letters that marks an English reply as wrong
const MAX_DEVANAGARI_IN_ENGLISH: f64 = 0.3;
/// Share of Latin letters that marks a Hindi reply as wrong
const MAX_LATIN_IN_HINDI: f64 = 0.7;

fn word_alternation(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid word list regex")
}

static PRAISE_RE: LazyLock<Regex> = LazyLock::new(|| word_alternation(PRAISE));
static TEACHING_RE: LazyLock<Regex> = LazyLock::new(|| word_alternation(TEACHING_MARKERS));
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| word_alternation(REFERENCE_MARKERS));

static RAW_FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*/\s*\d+").expect("valid fraction regex"));
static ORPHAN_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.!?।])").expect("valid punctuation regex"));
static STACKED_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,.!?।](?:\s*[,.!?।])+").expect("valid stacked regex"));
static LEADING_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s,.!?।]+").expect("valid leading punctuation regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '।')
}

/// Split into sentences, keeping each sentence's terminal punctuation.
/// A period between two digits is a decimal point, not a boundary.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (_, c) = chars[i];
        let decimal_point = c == '.'
            && i > 0
            && chars[i - 1].1.is_ascii_digit()
            && chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_digit());
        if is_terminator(c) && !decimal_point {
            let mut j = i;
            while chars.get(j + 1).is_some_and(|(_, n)| is_terminator(*n)) {
                j += 1;
            }
            let end = chars[j].0 + chars[j].1.len_utf8();
            push_sentence(&mut sentences, text.get(start..end));
            start = end;
            i = j + 1;
        } else {
            i += 1;
        }
    }
    push_sentence(&mut sentences, text.get(start..));
    sentences
}

fn push_sentence<'a>(sentences: &mut Vec<&'a str>, piece: Option<&'a str>) {
    if let Some(sentence) = piece.map(str::trim).filter(|s| !s.is_empty()) {
        sentences.push(sentence);
    }
}

fn ensure_terminated(mut text: String) -> String {
    if !text.ends_with(is_terminator) {
        text.push('.');
    }
    text
}

/// Word and sentence ceiling. Keeps whole leading sentences; a first
/// sentence that alone is too long is cut at a word boundary.
pub fn length(text: &str, limits: EnforcerLimits) -> Option<String> {
    let sentences = split_sentences(text);
    let words = text.split_whitespace().count();
    if words <= limits.max_words && sentences.len() <= limits.max_sentences {
        return None;
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0;
    for sentence in sentences.iter().take(limits.max_sentences) {
        let n = sentence.split_whitespace().count();
        if used + n > limits.max_words {
            break;
        }
        kept.push(sentence);
        used += n;
    }

    if kept.is_empty() {
        let cut = text
            .split_whitespace()
            .take(limits.max_words)
            .collect::<Vec<_>>()
            .join(" ");
        return Some(ensure_terminated(cut));
    }
    Some(ensure_terminated(kept.join(" ")))
}

/// Praise is only allowed after a correct answer
pub fn false_praise(text: &str, praise_allowed: bool) -> Option<String> {
    if praise_allowed || !PRAISE_RE.is_match(text) {
        return None;
    }
    let stripped = PRAISE_RE.replace_all(text, "");
    Some(tidy(&stripped))
}

/// Clean up what removing words leaves behind
fn tidy(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let attached = ORPHAN_PUNCT.replace_all(collapsed.trim(), "$1");
    let merged = STACKED_PUNCT.replace_all(&attached, |caps: &regex::Captures| {
        let run = &caps[0];
        // the strongest mark in the run survives
        if run.contains('?') {
            "?".to_string()
        } else {
            run.chars()
                .find(|c| is_terminator(*c))
                .unwrap_or(',')
                .to_string()
        }
    });
    let leading = LEADING_PUNCT.replace(merged.trim(), "");
    leading.trim().to_string()
}

/// Feedback on an answer must point at what the student said
pub fn lacks_specificity(text: &str, student_utterance: &str) -> bool {
    let lower = text.to_lowercase();
    let echoes_student = student_utterance
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .any(|w| lower.contains(w));
    !(echoes_student || REFERENCE_RE.is_match(text))
}

/// Outcome of splitting a reply that both teaches and asks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeachAndAsk {
    /// Question sentences dropped; the teaching remains
    QuestionsDropped(String),
    /// Every sentence asks, so nothing can be dropped
    Inseparable,
}

/// A reply that teaches must not also ask; question sentences are dropped
pub fn teach_and_question(text: &str) -> Option<TeachAndAsk> {
    let sentences = split_sentences(text);
    if sentences.len() < 2 {
        return None;
    }
    let teaches = sentences.iter().any(|s| TEACHING_RE.is_match(s));
    let asks = sentences.iter().any(|s| s.contains('?'));
    if !(teaches && asks) {
        return None;
    }
    let statements: Vec<&str> = sentences.into_iter().filter(|s| !s.contains('?')).collect();
    if statements.is_empty() {
        return Some(TeachAndAsk::Inseparable);
    }
    Some(TeachAndAsk::QuestionsDropped(ensure_terminated(statements.join(" "))))
}

#[allow(clippy::cast_precision_loss)] // letter counts
fn share(part: usize, total: usize) -> f64 {
    part as f64 / total as f64
}

/// Script must match the session language; Hinglish accepts either
pub fn wrong_language(text: &str, language: Language) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return false;
    }
    let devanagari = letters
        .iter()
        .filter(|c| ('\u{0900}'..='\u{097F}').contains(*c))
        .count();
    let latin = letters.iter().filter(|c| c.is_ascii_alphabetic()).count();
    match language {
        Language::English => share(devanagari, letters.len()) > MAX_DEVANAGARI_IN_ENGLISH,
        Language::Hindi => share(latin, letters.len()) > MAX_LATIN_IN_HINDI,
        Language::Hinglish => false,
    }
}

/// Raw fraction notation and brackets are rewritten for speech
pub fn tts_unsafe(text: &str, language: Language) -> Option<String> {
    let unsafe_text = RAW_FRACTION.is_match(text) || text.contains(['(', ')', '[', ']']);
    unsafe_text.then(|| speech::render_for_voice(text, language))
}

/// Exact repeat of the previous reply, or near-total token overlap with it
pub fn repeats(text: &str, previous: &str) -> bool {
    let now = text.trim().to_lowercase();
    let before = previous.trim().to_lowercase();
    if before.is_empty() {
        return false;
    }
    if now == before {
        return true;
    }
    let now_words: HashSet<&str> = now.split_whitespace().collect();
    if now_words.is_empty() {
        return false;
    }
    let before_words: HashSet<&str> = before.split_whitespace().collect();
    let shared = now_words.intersection(&before_words).count();
    share(shared, now_words.len()) > REPETITION_OVERLAP
}
