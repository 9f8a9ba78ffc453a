//! Deterministic answer evaluation
//!
//! Correctness is decided here and nowhere else. No model is consulted:
//! the utterance is normalized, parsed into an exact rational, and compared
//! against the canonical answer and every accepted alternate.

mod normalize;
mod number_words;
mod rational;


pub use normalize::normalize;
pub use rational::{parse_expression, Rational, Value};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// First number-looking run in otherwise unparseable text
static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:-\s*)?\d+(?:\.\d+)?(?:\s*/\s*\d+)?").expect("valid number regex")
});

pub const DEFAULT_DECIMAL_TOLERANCE: f64 = 0.01;

/// Relative distance under which a wrong answer is reported as close
const CLOSE_RATIO: f64 = 0.1;

/// What a partially correct answer got right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialCredit {
    /// Right magnitude, wrong sign
    SignFlipped,
    /// Numerator right, no denominator given
    DenominatorMissing,
    /// Numerator right, different denominator
    DenominatorWrong,
}

impl PartialCredit {
    pub fn describe(self) -> &'static str {
        match self {
            PartialCredit::SignFlipped => "the number is right but the sign is wrong",
            PartialCredit::DenominatorMissing => "the numerator is right but the denominator is missing",
            PartialCredit::DenominatorWrong => "the numerator is right but the denominator is wrong",
        }
    }
}

/// Why an answer was judged incorrect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncorrectReason {
    Empty,
    /// Nothing numeric could be read from the utterance
    Unparseable,
    /// Denominator matches, numerator does not
    DenominatorRight,
    /// Within ten percent of the answer
    Close,
    Wrong,
}

impl IncorrectReason {
    pub fn describe(self) -> &'static str {
        match self {
            IncorrectReason::Empty => "no answer was heard",
            IncorrectReason::Unparseable => "the answer could not be understood as a number or fraction",
            IncorrectReason::DenominatorRight => "the denominator is right but the numerator is wrong",
            IncorrectReason::Close => "the answer is close but not exact",
            IncorrectReason::Wrong => "the answer is wrong",
        }
    }
}

/// Outcome of deterministic answer checking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// `parsed` is absent when the match was literal rather than numeric
    Correct { parsed: Option<Value> },
    Partial {
        parsed: Value,
        credit: PartialCredit,
    },
    Incorrect {
        parsed: Option<Value>,
        reason: IncorrectReason,
    },
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct { .. })
    }

    pub fn parsed(&self) -> Option<&Value> {
        match self {
            Verdict::Correct { parsed } | Verdict::Incorrect { parsed, .. } => parsed.as_ref(),
            Verdict::Partial { parsed, .. } => Some(parsed),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Correct { .. } => "correct",
            Verdict::Partial { .. } => "partial",
            Verdict::Incorrect { .. } => "incorrect",
        }
    }

    /// Short description for feedback instructions
    pub fn describe(&self) -> &'static str {
        match self {
            Verdict::Correct { .. } => "the answer is correct",
            Verdict::Partial { credit, .. } => credit.describe(),
            Verdict::Incorrect { reason, .. } => reason.describe(),
        }
    }
}

/// Answer evaluator with a configurable decimal tolerance
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    tolerance: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMAL_TOLERANCE)
    }
}

impl Evaluator {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn evaluate(&self, utterance: &str, canonical: &str, alternates: &[String]) -> Verdict {
        if utterance.trim().is_empty() {
            return Verdict::Incorrect {
                parsed: None,
                reason: IncorrectReason::Empty,
            };
        }

        let student = normalize(utterance);
        let accepted: Vec<String> = std::iter::once(canonical)
            .chain(alternates.iter().map(String::as_str))
            .map(normalize)
            .collect();

        let parsed = read_value(&student);
        if accepted.iter().any(|a| !a.is_empty() && *a == student) {
            return Verdict::Correct { parsed };
        }

        let Some(value) = parsed else {
            return Verdict::Incorrect {
                parsed: None,
                reason: IncorrectReason::Unparseable,
            };
        };

        let targets: Vec<Value> = accepted.iter().filter_map(|a| parse_expression(a)).collect();
        if targets.iter().any(|t| self.equal(&value, t)) {
            return Verdict::Correct {
                parsed: Some(value),
            };
        }

        if let Some(credit) = targets.iter().find_map(|t| self.partial_credit(&value, t)) {
            return Verdict::Partial {
                parsed: value,
                credit,
            };
        }

        let reason = targets
            .first()
            .map_or(IncorrectReason::Wrong, |t| diagnose(&value, t));
        Verdict::Incorrect {
            parsed: Some(value),
            reason,
        }
    }

    fn equal(&self, student: &Value, target: &Value) -> bool {
        if student.decimal || target.decimal {
            (student.exact.to_f64() - target.exact.to_f64()).abs() <= self.tolerance
        } else {
            student.exact.same_value(target.exact)
        }
    }

    /// Sign flips are judged with the same tolerance as equality
    fn partial_credit(&self, student: &Value, target: &Value) -> Option<PartialCredit> {
        if !target.exact.is_zero() {
            let flipped = if student.decimal || target.decimal {
                (student.exact.to_f64() + target.exact.to_f64()).abs() <= self.tolerance
            } else {
                target
                    .exact
                    .checked_neg()
                    .is_some_and(|neg| student.exact.same_value(neg))
            };
            if flipped {
                return Some(PartialCredit::SignFlipped);
            }
        }
        denominator_credit(student, target)
    }
}

/// Evaluate with the default tolerance
#[allow(dead_code)] // Used by callers without configured limits
pub fn evaluate(utterance: &str, canonical: &str, alternates: &[String]) -> Verdict {
    Evaluator::default().evaluate(utterance, canonical, alternates)
}

/// Whether spoken text carries a number once number words are resolved
pub fn looks_numeric(utterance: &str) -> bool {
    normalize(utterance).chars().any(|c| c.is_ascii_digit())
}

/// Parse the whole normalized text, or failing that its first number
fn read_value(normalized: &str) -> Option<Value> {
    parse_expression(normalized).or_else(|| {
        FIRST_NUMBER
            .find(normalized)
            .and_then(|m| parse_expression(m.as_str()))
    })
}

fn denominator_credit(student: &Value, target: &Value) -> Option<PartialCredit> {

    let (tn, td) = target.written?;
    let (sn, sd) = student.written?;
    if td == 1 || student.decimal || sn != tn {
        return None;
    }
    if sd == 1 {
        Some(PartialCredit::DenominatorMissing)
    } else if sd != td {
        Some(PartialCredit::DenominatorWrong)
    } else {
        None
    }
}

fn diagnose(student: &Value, target: &Value) -> IncorrectReason {
    if let (Some((_, sd)), Some((_, td))) = (student.written, target.written) {
        if td != 1 && sd == td {
            return IncorrectReason::DenominatorRight;
        }
    }

    let expected = target.exact.to_f64();
    let got = student.exact.to_f64();
    if expected.abs() > f64::EPSILON && ((got - expected) / expected).abs() <= CLOSE_RATIO {
        IncorrectReason::Close
    } else {
        IncorrectReason::Wrong
    }
}
