//! Rendering enforced text for text-to-speech
//!
//! Speech engines read symbols literally, so maths notation is spelled out
//! before a reply reaches the voice collaborator.

use crate::state_machine::Language;
use regex::Regex;
use std::sync::LazyLock;

static NEGATIVE_FRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\w])-\s*(\d+)\s*/\s*(\d+)").expect("valid negative fraction regex")
});
static FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("valid fraction regex"));
static SPOKEN_FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) by (\d+)").expect("valid spoken fraction regex"));
static EQUALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*=\s*").expect("valid equals regex"));
static POWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^(\d+)").expect("valid power regex"));
static NEGATIVE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w])-(\d)").expect("valid negative number regex"));
static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("valid percent regex"));
static DEGREES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)°").expect("valid degree regex"));
static UNSPEAKABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,?!:;'।-]").expect("valid symbol regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,?!।])").expect("valid punctuation regex"));

const ABBREVIATIONS: &[(&str, &str)] = &[
    (r"\bCh\.?\s*(\d+)", "Chapter $1"),
    (r"\bEx\.?\s*(\d+)", "Exercise $1"),
    (r"\bQ\.?\s*(\d+)", "Question $1"),
    (r"\bFig\.?\s*(\d+)", "Figure $1"),
    (r"\be\.g\.", "for example"),
    (r"\bi\.e\.", "that is"),
];

static ABBREVIATION_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("valid abbreviation regex"),
                *replacement,
            )
        })
        .collect()
});

/// Spell out maths notation and strip symbols a speech engine would read
/// literally.
///
/// `-5/9` becomes "minus 5 by 9", `×` becomes "into", `=` becomes "equals",
/// and brackets are dropped. Hindi output says "baata" for "by".
pub fn render_for_voice(text: &str, language: Language) -> String {
    let mut out: String = text
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}'))
        .collect();

    out = NEGATIVE_FRACTION
        .replace_all(&out, "${1}minus $2 by $3")
        .into_owned();
    out = FRACTION.replace_all(&out, "$1 by $2").into_owned();

    out = out
        .replace(['×', '*'], " into ")
        .replace('÷', " divided by ")
        .replace('+', " plus ")
        .replace('−', " minus ")
        .replace('≠', " not equal to ")
        .replace('≤', " less than or equal to ")
        .replace('≥', " greater than or equal to ")
        .replace('<', " less than ")
        .replace('>', " greater than ")
        .replace('²', " square")
        .replace('³', " cube")
        .replace('π', "pi");
    out = EQUALS.replace_all(&out, " equals ").into_owned();
    out = POWER.replace_all(&out, " to the power $1").into_owned();
    out = NEGATIVE_NUMBER
        .replace_all(&out, "${1}minus $2")
        .into_owned();
    out = PERCENT.replace_all(&out, "$1 percent").into_owned();
    out = DEGREES.replace_all(&out, "$1 degrees").into_owned();

    for (re, replacement) in ABBREVIATION_RES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }

    if language == Language::Hindi {
        out = SPOKEN_FRACTION.replace_all(&out, "$1 baata $2").into_owned();
    }

    out = UNSPEAKABLE.replace_all(&out, "").into_owned();
    out = WHITESPACE.replace_all(&out, " ").into_owned();
    SPACE_BEFORE_PUNCT
        .replace_all(out.trim(), "$1")
        .into_owned()
}
