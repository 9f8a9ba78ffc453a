//! Utterance normalization
//!
//! Turns a spoken answer such as "the answer is minus one third" into an
//! arithmetic string such as "- 1/3" that the expression parser accepts.

use super::number_words::{
    fraction_word, number_word, operator_pair, operator_word, phonetic_english, NumberWord,
};

/// Lead-ins students put before the actual answer
const FILLERS: &[&str] = &[
    "the answer is",
    "answer is",
    "i think its",
    "i think it's",
    "i think",
    "it is",
    "it's",
    "its",
    "mera answer hai",
    "mera answer",
    "jawab hai",
    "jawab",
    "x equals",
    "x is",
    "x =",
    "answer",
    "ans",
    "umm",
    "um",
    "so",
];

/// Normalize an utterance into a whitespace-separated arithmetic string.
///
/// Steps run in a fixed order: lowercase, phonetic respelling, filler
/// removal, symbol spacing, two-word operators, number words, fraction
/// words (compound before single), decimal points, single-word operators.
/// Only the part after the last `=` is kept.
pub fn normalize(utterance: &str) -> String {
    let lowered = utterance.trim().to_lowercase();
    let respelled = lowered
        .split_whitespace()
        .map(|w| phonetic_english(w).unwrap_or(w))
        .collect::<Vec<_>>()
        .join(" ");
    let spaced = space_symbols(strip_fillers(&respelled));
    let words: Vec<String> = spaced.split_whitespace().map(str::to_string).collect();

    let words = join_operator_pairs(words);
    let words = collapse_numbers(words);
    let words = collapse_fractions(words);
    let words = join_decimal_points(words);
    let words: Vec<String> = words
        .into_iter()
        .map(|w| operator_word(&w).map_or(w, str::to_string))
        .collect();

    after_last_equals(words).join(" ")
}

fn strip_fillers(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        let shortest = FILLERS
            .iter()
            .filter_map(|filler| strip_phrase(rest, filler))
            .min_by_key(|r| r.len());
        match shortest {
            Some(r) => rest = r.trim_start(),
            None => return rest,
        }
    }
}

/// Strip `phrase` when it ends on a word boundary
fn strip_phrase<'a>(text: &'a str, phrase: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(phrase)?;
    let phrase_ends_on_symbol = phrase.chars().last().is_some_and(|c| !c.is_alphanumeric());
    match rest.chars().next() {
        None => Some(rest),
        Some(_) if phrase_ends_on_symbol => Some(rest),
        Some(c) if !c.is_alphanumeric() => Some(rest),
        Some(_) => None,
    }
}

/// Put spaces around operators and drop punctuation that carries no value
fn space_symbols(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|j| chars.get(j)).copied();
        let next = chars.get(i + 1).copied();
        match c {
            '+' | '*' | '/' | '=' | '(' | ')' | '×' | '÷' | '−' => {
                out.push(' ');
                out.push(c);
                out.push(' ');
            }
            '-' => {
                let hyphenated = prev.is_some_and(char::is_alphabetic)
                    && next.is_some_and(char::is_alphabetic);
                if hyphenated {
                    out.push(' ');
                } else {
                    out.push_str(" - ");
                }
            }
            '.' => {
                if next.is_some_and(|n| n.is_ascii_digit()) {
                    out.push('.');
                } else {
                    out.push(' ');
                }
            }
            '\'' | '’' => {}
            ',' | '?' | '!' | ';' | ':' | '"' | '।' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

fn join_operator_pairs(words: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let pair = out.last().and_then(|prev| operator_pair(prev, &word));
        if let Some(symbol) = pair {
            out.pop();
            out.push(symbol.to_string());
        } else {
            out.push(word);
        }
    }
    out
}

/// Fold runs of number words into digits ("twenty one" -> "21")
fn collapse_numbers(words: Vec<String>) -> Vec<String> {
    fn flush(out: &mut Vec<String>, run: &mut Option<u64>) {
        if let Some(n) = run.take() {
            out.push(n.to_string());
        }
    }

    // The raw word stays so the answer fails to parse
    fn overflow(out: &mut Vec<String>, run: &mut Option<u64>, word: String) {
        flush(out, run);
        out.push(word);
    }

    let mut out = Vec::with_capacity(words.len());
    let mut run: Option<u64> = None;
    for word in words {
        match number_word(&word) {
            Some(NumberWord::Whole(n)) => {
                flush(&mut out, &mut run);
                out.push(n.to_string());
            }
            Some(NumberWord::Hundred) => {
                match run.map_or(Some(100), |r| r.max(1).checked_mul(100)) {
                    Some(n) => run = Some(n),
                    None => overflow(&mut out, &mut run, word),
                }
            }
            Some(NumberWord::Tens(n) | NumberWord::Teen(n)) => {
                if run.is_some_and(|r| r % 100 != 0) {
                    flush(&mut out, &mut run);
                }
                match run.unwrap_or(0).checked_add(n) {
                    Some(n) => run = Some(n),
                    None => overflow(&mut out, &mut run, word),
                }
            }
            Some(NumberWord::Unit(n)) => {
                if run.is_some_and(|r| r == 0 || r % 10 != 0) {
                    flush(&mut out, &mut run);
                }
                match run.unwrap_or(0).checked_add(n) {
                    Some(n) => run = Some(n),
                    None => overflow(&mut out, &mut run, word),
                }
            }
            None => {
                flush(&mut out, &mut run);
                out.push(word);
            }
        }
    }
    flush(&mut out, &mut run);
    out
}

/// "1 third" -> "1/3" first, then a lone "half" -> "1/2"
fn collapse_fractions(words: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let Some(den) = fraction_word(&word) else {
            out.push(word);
            continue;
        };
        let multiplier = out.last().and_then(|prev| prev.parse::<u64>().ok());
        if let Some(num) = multiplier {
            out.pop();
            out.push(format!("{num}/{den}"));
        } else {
            out.push(format!("1/{den}"));
        }
    }
    out
}

/// "0 point 5" -> "0.5"
fn join_decimal_points(words: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut iter = words.into_iter().peekable();
    while let Some(word) = iter.next() {
        let is_point = word == "point" || word == "dashamlav";
        let whole_before = out.last().is_some_and(|prev| is_digits(prev));
        let digits_after = iter.peek().is_some_and(|next| is_digits(next));
        if is_point && whole_before && digits_after {
            if let (Some(whole), Some(frac)) = (out.pop(), iter.next()) {
                out.push(format!("{whole}.{frac}"));
            }
        } else {
            out.push(word);
        }
    }
    out
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn after_last_equals(words: Vec<String>) -> Vec<String> {
    match words.iter().rposition(|w| w == "=") {
        None => words,
        Some(pos) => {
            let (before, after) = words.split_at(pos);
            let after = after.get(1..).unwrap_or_default();
            if after.is_empty() {
                before.to_vec()
            } else {
                after.to_vec()
            }
        }
    }
}
