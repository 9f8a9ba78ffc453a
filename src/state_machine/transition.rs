//! Pure transition function
//!
//! Every (state, intent) pair is an explicit arm of one `match`; there is no
//! wildcard, so a new state or intent fails to compile until its cells are
//! written. Answer cells return a pending target that [`after_verdict`]
//! resolves once the evaluator has run.

use super::action::{Action, Effect, EndReason};
use super::intent::{Intent, IntentCategory, MetaTopic};
use super::state::{SessionContext, State};
use crate::config::SessionLimits;
use crate::evaluator::Verdict;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hint levels given before the solution is revealed
const MAX_HINT_LEVEL: u8 = 2;
/// Highest reteach material index
const MAX_MATERIAL_INDEX: u8 = 2;

/// Where a transition leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state", rename_all = "snake_case")]
pub enum Target {
    Resolved(State),
    /// Resolved by a second lookup keyed on the verdict
    PendingVerdict,
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub target: Target,
    pub action: Action,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn to(state: State, action: Action) -> Self {
        Self {
            target: Target::Resolved(state),
            action,
            effects: vec![],
        }
    }

    pub fn pending() -> Self {
        Self {
            target: Target::PendingVerdict,
            action: Action::Evaluate,
            effects: vec![],
        }
    }

    pub fn end(reason: EndReason) -> Self {
        Self::to(State::SessionEnd, Action::EndSession { reason })
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    #[allow(dead_code)] // Used for logging/debugging
    pub fn next_state(&self) -> Option<State> {
        match self.target {
            Target::Resolved(state) => Some(state),
            Target::PendingVerdict => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.target, Target::PendingVerdict)
    }

    pub fn loads_question(&self) -> bool {
        self.effects.contains(&Effect::LoadNextQuestion)
    }
}

/// Errors that can occur when committing a transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Transition from {state} is still waiting for a verdict")]
    PendingVerdict { state: State },
    #[error("Verdict routing requires an active question in {state}")]
    NoActiveQuestion { state: State },
}

/// Pure transition function
///
/// Given the same state, intent, context and limits this always returns the
/// same transition. The session time ceiling is checked against
/// `ctx.last_activity`, which the caller refreshes before each turn.
#[allow(clippy::too_many_lines, clippy::match_same_arms)] // one arm group per state
pub fn transition(
    state: State,
    intent: &Intent,
    ctx: &SessionContext,
    limits: &SessionLimits,
) -> Transition {
    use IntentCategory as I;
    use State as S;

    if !state.is_terminal() && ctx.elapsed() >= limits.session_timeout {
        return Transition::end(EndReason::TimeLimit);
    }

    match (state, intent.category) {
        // ============================================================
        // Terminal state absorbs everything
        // ============================================================
        (S::SessionEnd, I::LanguageSwitch) => {
            Transition::to(S::SessionEnd, Action::Farewell).with_effects(store_language(intent))
        }
        (
            S::SessionEnd,
            I::Acknowledge
            | I::DontKnow
            | I::AnswerAttempt
            | I::ConceptRequest
            | I::MetaQuestion
            | I::Comfort
            | I::Stop
            | I::Repeat
            | I::Unintelligible,
        ) => Transition::to(S::SessionEnd, Action::Farewell),

        // ============================================================
        // Cross-cutting rules for every live state
        // ============================================================
        (
            S::Greeting | S::Teaching | S::AwaitingAnswer | S::Hinting | S::Explaining | S::Comfort,
            I::Stop,
        ) => Transition::end(EndReason::Stopped),

        (
            S::Greeting | S::Teaching | S::AwaitingAnswer | S::Hinting | S::Explaining | S::Comfort,
            I::LanguageSwitch,
        ) => {
            let language = intent.language().unwrap_or(ctx.language);
            Transition::to(state, Action::ReissueInLanguage { language })
                .with_effects(store_language(intent))
        }

        (S::Comfort, I::Comfort | I::DontKnow | I::Repeat) => {
            Transition::to(S::Comfort, Action::Comfort)
        }
        (
            S::Greeting | S::Teaching | S::AwaitingAnswer | S::Hinting | S::Explaining,
            I::Comfort,
        ) => Transition::to(S::Comfort, Action::Comfort).with_effect(Effect::RememberResume(state)),

        (
            S::Greeting | S::Teaching | S::AwaitingAnswer | S::Hinting | S::Explaining | S::Comfort,
            I::MetaQuestion,
        ) => Transition::to(
            state,
            Action::AnswerMeta {
                topic: intent.meta_topic().unwrap_or(MetaTopic::Topic),
            },
        ),

        (
            S::Greeting | S::Teaching | S::AwaitingAnswer | S::Hinting | S::Explaining | S::Comfort,
            I::Unintelligible,
        ) => Transition::to(
            state,
            Action::AskRepeat {
                attempt: ctx.unclear_count.saturating_add(1),
            },
        )
        .with_effect(Effect::CountUnclear),

        // ============================================================
        // Greeting
        // ============================================================
        (S::Greeting, I::Acknowledge | I::DontKnow | I::AnswerAttempt | I::ConceptRequest) => {
            start_teaching(ctx)
        }
        (S::Greeting, I::Repeat) => Transition::to(S::Greeting, Action::Greet),

        // ============================================================
        // Teaching
        // ============================================================
        (S::Teaching, I::Acknowledge) => ask_question(ctx, false),
        (S::Teaching, I::DontKnow | I::ConceptRequest | I::Repeat) => reteach(ctx, limits),
        (S::Teaching, I::AnswerAttempt) => answer_cell(ctx),

        // ============================================================
        // Awaiting an answer
        // ============================================================
        (S::AwaitingAnswer, I::Acknowledge | I::Repeat) => {
            Transition::to(S::AwaitingAnswer, Action::RereadQuestion)
        }
        (S::AwaitingAnswer, I::DontKnow) => escalate_hint(ctx),
        (S::AwaitingAnswer, I::AnswerAttempt) => answer_cell(ctx),
        (S::AwaitingAnswer, I::ConceptRequest) => back_to_teaching(),

        // ============================================================
        // Hinting
        // ============================================================
        (S::Hinting, I::Acknowledge) => Transition::to(S::AwaitingAnswer, Action::RereadQuestion),
        (S::Hinting, I::DontKnow) => escalate_hint(ctx),
        (S::Hinting, I::AnswerAttempt) => answer_cell(ctx),
        (S::Hinting, I::Repeat) => Transition::to(
            S::Hinting,
            Action::GiveHint {
                level: ctx.hint_level.max(1),
            },
        ),
        (S::Hinting, I::ConceptRequest) => back_to_teaching(),

        // ============================================================
        // Explaining (solution revealed)
        // ============================================================
        (S::Explaining, I::Acknowledge | I::AnswerAttempt) => advance(ctx, limits),
        (S::Explaining, I::DontKnow | I::ConceptRequest) => back_to_teaching(),
        (S::Explaining, I::Repeat) => Transition::to(S::Explaining, Action::RevealSolution),

        // ============================================================
        // Comfort
        // ============================================================
        (S::Comfort, I::Acknowledge | I::AnswerAttempt | I::ConceptRequest) => {
            let to = ctx.resume_state.unwrap_or(S::Teaching);
            Transition::to(to, Action::Resume { to }).with_effect(Effect::ClearResume)
        }
    }
}

/// Resolve a pending answer cell once the verdict is known.
///
/// Every verdict counts as an attempt. Correct advances; Partial gives
/// guidance at the current hint level; Incorrect escalates hint 1, hint 2,
/// then the full solution.
pub fn after_verdict(
    verdict: &Verdict,
    ctx: &SessionContext,
    limits: &SessionLimits,
) -> Result<Transition, TransitionError> {
    if ctx.question.is_none() {
        return Err(TransitionError::NoActiveQuestion { state: ctx.state });
    }

    let resolved = match verdict {
        Verdict::Correct { .. } => advance(ctx, limits).with_effect(Effect::IncrementScore),
        Verdict::Partial { .. } => Transition::to(State::Hinting, Action::PartialGuidance)
            .with_effect(Effect::SetHintLevel(ctx.hint_level.max(1))),
        Verdict::Incorrect { .. } => escalate_hint(ctx),
    };
    Ok(resolved.with_effect(Effect::CountAttempt))
}

fn store_language(intent: &Intent) -> Option<Effect> {
    intent.language().map(Effect::StoreLanguage)
}

fn start_teaching(ctx: &SessionContext) -> Transition {
    let t =
        Transition::to(State::Teaching, Action::StartTeaching).with_effect(Effect::ResetReteach);
    if ctx.question.is_none() {
        t.with_effect(Effect::LoadNextQuestion)
    } else {
        t
    }
}

fn back_to_teaching() -> Transition {
    Transition::to(State::Teaching, Action::StartTeaching).with_effect(Effect::ResetReteach)
}

fn ask_question(ctx: &SessionContext, forced: bool) -> Transition {
    let t = Transition::to(State::AwaitingAnswer, Action::AskQuestion { forced });
    if ctx.question.is_none() {
        t.with_effect(Effect::LoadNextQuestion)
    } else {
        t
    }
}

/// Reteach with progressively different material until the cap forces a
/// question, so a student cannot stay in teaching indefinitely.
fn reteach(ctx: &SessionContext, limits: &SessionLimits) -> Transition {
    let count = ctx.reteach_count.saturating_add(1);
    if count >= limits.max_reteach {
        return ask_question(ctx, true).with_effect(Effect::ResetReteach);
    }
    Transition::to(
        State::Teaching,
        Action::Reteach {
            material_index: count.min(MAX_MATERIAL_INDEX),
        },
    )
    .with_effect(Effect::IncrementReteach)
}

fn answer_cell(ctx: &SessionContext) -> Transition {
    if ctx.question.is_some() {
        Transition::pending()
    } else {
        ask_question(ctx, false)
    }
}

fn escalate_hint(ctx: &SessionContext) -> Transition {
    if ctx.hint_level < MAX_HINT_LEVEL {
        let level = ctx.hint_level + 1;
        Transition::to(State::Hinting, Action::GiveHint { level })
            .with_effect(Effect::SetHintLevel(level))
    } else {
        Transition::to(State::Explaining, Action::RevealSolution)
    }
}

fn advance(ctx: &SessionContext, limits: &SessionLimits) -> Transition {
    if ctx.questions_asked >= limits.max_questions {
        return Transition::end(EndReason::Completed);
    }
    Transition::to(State::AwaitingAnswer, Action::AdvanceQuestion).with_effects([
        Effect::LoadNextQuestion,
        Effect::SetHintLevel(0),
        Effect::ResetReteach,
    ])
}
