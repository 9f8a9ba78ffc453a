//! Curated phrase banks for the fast classification path
//!
//! Each bank is a list of regex fragments compiled into one alternation
//! that only matches on word boundaries, so "ha" never fires inside "hai".
//! Boundaries include combining marks so Devanagari words match whole.

use regex::Regex;
use std::sync::LazyLock;

const STOP: &[&str] = &[
    "bye",
    "goodbye",
    "good bye",
    "good night",
    "stop",
    "band karo",
    "band kar do",
    "bas karo",
    "bas ho gaya",
    "khatam",
    "finish",
    "let'?s stop",
    "i want to stop",
    "i have to go",
    "enough",
    "बंद करो",
    "खतम",
    "बाय",
];

const COMFORT: &[&str] = &[
    "i give up",
    "give up",
    "haar gaya",
    "haar gayi",
    "bahut mushkil",
    "bohot mushkil",
    "too hard",
    "too difficult",
    "nahi kar sakta",
    "nahi kar sakti",
    "can'?t do (?:this|it)",
    "thak gaya",
    "thak gayi",
    "tired",
    "bore ho",
    "boring",
    "rude",
    "gussa",
    "angry",
    "hopeless",
    "kuch nahi hoga",
    "crying",
    "ro raha",
    "ro rahi",
    "sad",
    "i hate this",
    "i'?m stupid",
    "बहुत मुश्किल",
    "हार गया",
    "हार गयी",
    "थक गया",
];

const REPEAT: &[&str] = &[
    "phir se bolo",
    "repeat",
    "say (?:that )?again",
    "come again",
    "pardon",
    "kya bola",
    "sunai nahi",
    "didn'?t hear",
    "what did you say",
    "dobara bolo",
    "ek baar phir bolo",
    "फिर से बोलो",
    "दोबारा बोलो",
    "सुनाई नहीं",
];

const DONT_KNOW: &[&str] = &[
    "nahi samjha",
    "nahi samjhi",
    "nahi samajh",
    "samajh nahi",
    "samjha nahi",
    "(?:nahi|nai) aaya",
    "nahi pata",
    "pata nahi",
    "nahi maloom",
    "kuch samajh nahi",
    "kya matlab",
    "(?:i )?don'?t know",
    "(?:i )?do not know",
    "no idea",
    "(?:i )?don'?t understand",
    "(?:i )?do not understand",
    "(?:i )?don'?t get (?:it|this)",
    "(?:i )?can'?t understand",
    "not understanding",
    "what do you mean",
    "(?:still )?not clear",
    "doesn'?t make sense",
    "i'?m (?:so )?confused",
    "confused",
    "confusing",
    "explain again",
    "phir se (?:batao|samjhao)",
    "dobara (?:batao|samjhao)",
    "ek baar aur",
    "mushkil",
    "difficult",
    "hard",
    "नहीं समझा",
    "नहीं पता",
    "पता नहीं",
    "समझ नहीं",
    "नहीं आया",
    "क्या मतलब",
    "फिर से बताओ",
];

const ACKNOWLEDGE: &[&str] = &[
    "haan",
    "haa",
    "ha",
    "han",
    "yes",
    "yeah",
    "yep",
    "okay",
    "ok",
    "sure",
    "theek",
    "thik",
    "theek hai",
    "samajh gaya",
    "samajh gayi",
    "samajh aa gaya",
    "samjha",
    "samjhi",
    "pata hai",
    "accha",
    "acha",
    "achha",
    "hmm+",
    "got it",
    "understood",
    "next",
    "agla",
    "agle",
    "aage",
    "हां",
    "हाँ",
    "ठीक",
    "समझ गया",
    "समझ गयी",
    "समझा",
    "अच्छा",
    "आगे",
];

const CONCEPT: &[&str] = &[
    "explain",
    "batao",
    "bataiye",
    "kya hai",
    "kya hota hai",
    "samjhao",
    "samjhaiye",
    "sikhao",
    "teach me",
    "what is",
    "what are",
    "how",
    "why",
    "kaise",
    "kyun",
    "kyon",
    "बताओ",
    "बताइये",
    "क्या है",
    "समझाओ",
    "कैसे",
    "क्यों",
];

/// Whole-word alternation over `fragments`
pub fn phrase_regex(fragments: &[&str]) -> Regex {
    let alternation = fragments.join("|");
    Regex::new(&format!(
        r"(?i)(?:^|[^\p{{L}}\p{{M}}\p{{N}}'])(?:{alternation})(?:$|[^\p{{L}}\p{{M}}\p{{N}}'])"
    ))
    .expect("valid phrase regex")
}

pub static STOP_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(STOP));
pub static COMFORT_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(COMFORT));
pub static REPEAT_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(REPEAT));
pub static DONT_KNOW_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(DONT_KNOW));
pub static ACKNOWLEDGE_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(ACKNOWLEDGE));
pub static CONCEPT_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(CONCEPT));
