//! Language-switch and meta-question detection

use super::phrases::phrase_regex;
use crate::state_machine::{Language, MetaTopic};
use regex::Regex;
use std::sync::LazyLock;

static ENGLISH_SWITCH: LazyLock<Regex> = LazyLock::new(|| {
    phrase_regex(&[
        r"(?:speak|talk|respond|reply)\s*(?:in\s*)?english",
        r"english\s*(?:please|mein|me|mai)",
        r"please\s*(?:speak|talk)\s*(?:in\s*)?english",
        r"can\s*you\s*(?:speak|talk)\s*(?:in\s*)?english",
        r"i\s*don'?t\s*understand\s*hindi",
        r"not\s*understanding\s*hindi",
        r"in\s*english\s*please",
        r"switch\s*to\s*english",
        r"use\s*english",
        r"only\s*english",
    ])
});

static HINDI_SWITCH: LazyLock<Regex> = LazyLock::new(|| {
    phrase_regex(&[
        r"hindi\s*(?:mein|me|mai)\s*(?:bolo|boliye|baat\s*karo|samjhao)",
        r"(?:speak|talk)\s*(?:in\s*)?hindi",
        r"hindi\s*please",
        r"switch\s*to\s*hindi",
        r"only\s*hindi",
        r"हिंदी\s*में",
    ])
});

static HINGLISH_SWITCH: LazyLock<Regex> = LazyLock::new(|| {
    phrase_regex(&[
        r"hinglish\s*(?:mein|me|mai)",
        r"(?:speak|talk)\s*(?:in\s*)?hinglish",
        r"switch\s*to\s*hinglish",
        r"mix\s*(?:karke|kar\s*ke)\s*bolo",
    ])
});

static META_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    phrase_regex(&[
        r"(?:what|which)\s+chapter",
        r"kaun\s*sa\s+chapter",
        r"kis\s+chapter",
        r"कौनसा\s+chapter",
    ])
});

static META_TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    phrase_regex(&[
        r"(?:what|which)\s+topic",
        r"what\s+are\s+we\s+(?:learning|studying|doing)",
        r"what\s+(?:is|are)\s+we\s+on",
        r"what'?s\s+the\s+topic",
        r"current\s+topic",
        r"kya\s+padh\s+rahe",
        r"क्या\s+पढ़\s+रहे",
    ])
});

static META_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    phrase_regex(&[r"(?:what|which)\s+subject", r"kaun\s*sa\s+subject"])
});

static META_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    phrase_regex(&[
        r"how\s+long\s+have\s+we\s+been",
        r"what\s+did\s+we\s+cover",
        r"what\s+have\s+we\s+(?:done|covered|learned)",
        r"how\s+many\s+(?:questions|right)",
        r"(?:my\s+)?score",
        r"kitna\s+ho\s+gaya",
        r"कितना\s+हो\s+गया",
    ])
});

/// Explicit request to change the output language
pub fn detect_language_switch(text: &str) -> Option<Language> {
    if ENGLISH_SWITCH.is_match(text) {
        Some(Language::English)
    } else if HINGLISH_SWITCH.is_match(text) {
        Some(Language::Hinglish)
    } else if HINDI_SWITCH.is_match(text) {
        Some(Language::Hindi)
    } else {
        None
    }
}

/// Question about the session itself rather than the material
pub fn detect_meta_question(text: &str) -> Option<MetaTopic> {
    [
        (&META_CHAPTER, MetaTopic::Chapter),
        (&META_TOPIC, MetaTopic::Topic),
        (&META_SUBJECT, MetaTopic::Subject),
        (&META_PROGRESS, MetaTopic::Progress),
    ]
    .into_iter()
    .find_map(|(re, topic)| re.is_match(text).then_some(topic))
}
