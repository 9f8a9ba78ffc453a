//! Output enforcement
//!
//! Every generated utterance passes through [`enforce`] before it reaches
//! the student. Rules run in a fixed order and each sees the text as left by
//! the rules before it. Violations are returned as data; nothing here fails.

mod fallback;
mod rules;

#[cfg(test)]
mod proptests;

pub use fallback::safe_fallback;

use crate::config::EnforcerLimits;
use crate::evaluator::Verdict;
use crate::state_machine::{Language, State};
use rules::TeachAndAsk;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enforcement rule identifiers, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rule {
    Length,
    FalsePraise,
    NoSpecificity,
    TeachAndQuestion,
    WrongLanguage,
    TtsUnsafe,
    Repetition,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::Length => "LENGTH",
            Rule::FalsePraise => "FALSE_PRAISE",
            Rule::NoSpecificity => "NO_SPECIFICITY",
            Rule::TeachAndQuestion => "TEACH_AND_QUESTION",
            Rule::WrongLanguage => "WRONG_LANGUAGE",
            Rule::TtsUnsafe => "TTS_UNSAFE",
            Rule::Repetition => "REPETITION",
        }
    }

    /// Instruction line telling the generator how to avoid this violation
    pub fn correction(self) -> &'static str {
        match self {
            Rule::Length => "Use at most two short sentences.",
            Rule::FalsePraise => "Do not praise; the answer was not correct.",
            Rule::NoSpecificity => "Refer to exactly what the student said.",
            Rule::TeachAndQuestion => "Either explain or ask, not both.",
            Rule::WrongLanguage => "Reply only in the requested language.",
            Rule::TtsUnsafe => "Write numbers in words, without slashes or brackets.",
            Rule::Repetition => "Do not repeat your previous reply; say it differently.",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the enforcer needs to know about the turn
#[derive(Debug, Clone, Copy)]
pub struct EnforceContext<'a> {
    /// State the reply is spoken in
    pub state: State,
    pub language: Language,
    /// Verdict on the student's answer this turn, if one was evaluated
    pub verdict: Option<&'a Verdict>,
    pub student_utterance: Option<&'a str>,
    /// The tutor's previous reply
    pub previous: Option<&'a str>,
    pub limits: EnforcerLimits,
}

impl<'a> EnforceContext<'a> {
    pub fn new(state: State, language: Language) -> Self {
        Self {
            state,
            language,
            verdict: None,
            student_utterance: None,
            previous: None,
            limits: EnforcerLimits::default(),
        }
    }

    pub fn with_verdict(mut self, verdict: Option<&'a Verdict>) -> Self {
        self.verdict = verdict;
        self
    }

    pub fn with_student_utterance(mut self, utterance: &'a str) -> Self {
        self.student_utterance = Some(utterance);
        self
    }

    pub fn with_previous(mut self, previous: Option<&'a str>) -> Self {
        self.previous = previous;
        self
    }

    pub fn with_limits(mut self, limits: EnforcerLimits) -> Self {
        self.limits = limits;
        self
    }

    fn praise_allowed(&self) -> bool {
        self.verdict.is_some_and(Verdict::is_correct)
    }

    /// Feedback on an evaluated answer in the hinting or explaining states
    fn needs_specificity(&self) -> bool {
        self.verdict.is_some() && matches!(self.state, State::Hinting | State::Explaining)
    }
}

/// Outcome of enforcing one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementResult {
    pub passed: bool,
    /// Text after every repair
    pub text: String,
    pub violations: Vec<Rule>,
    /// Violations the text still carries after repair
    #[serde(default)]
    pub unrepaired: Vec<Rule>,
}

impl EnforcementResult {
    /// The repaired text is fit to speak when every violation was repaired
    pub fn is_deliverable(&self) -> bool {
        !self.text.trim().is_empty() && self.unrepaired.is_empty()
    }
}

/// Run every rule over `text`
pub fn enforce(text: &str, ctx: &EnforceContext<'_>) -> EnforcementResult {
    let mut violations = Vec::new();
    let mut unrepaired = Vec::new();
    let mut current = text.trim().to_string();

    if let Some(fixed) = rules::length(&current, ctx.limits) {
        violations.push(Rule::Length);
        current = fixed;
    }
    if let Some(fixed) = rules::false_praise(&current, ctx.praise_allowed()) {
        violations.push(Rule::FalsePraise);
        current = fixed;
    }
    if ctx.needs_specificity()
        && ctx
            .student_utterance
            .is_some_and(|said| rules::lacks_specificity(&current, said))
    {
        violations.push(Rule::NoSpecificity);
        unrepaired.push(Rule::NoSpecificity);
    }
    match rules::teach_and_question(&current) {
        Some(TeachAndAsk::QuestionsDropped(fixed)) => {
            violations.push(Rule::TeachAndQuestion);
            current = fixed;
        }
        Some(TeachAndAsk::Inseparable) => {
            violations.push(Rule::TeachAndQuestion);
            unrepaired.push(Rule::TeachAndQuestion);
        }
        None => {}
    }
    if rules::wrong_language(&current, ctx.language) {
        violations.push(Rule::WrongLanguage);
        unrepaired.push(Rule::WrongLanguage);
    }
    if let Some(fixed) = rules::tts_unsafe(&current, ctx.language) {
        violations.push(Rule::TtsUnsafe);
        current = fixed;
    }
    if ctx
        .previous
        .is_some_and(|previous| rules::repeats(&current, previous))
    {
        violations.push(Rule::Repetition);
        unrepaired.push(Rule::Repetition);
    }

    if !violations.is_empty() {
        let ids: Vec<&str> = violations.iter().map(|r| r.as_str()).collect();
        tracing::debug!(state = %ctx.state, violations = ?ids, "Enforcement violations");
    }

    EnforcementResult {
        passed: violations.is_empty(),
        text: current,
        violations,
        unrepaired,
    }
}
