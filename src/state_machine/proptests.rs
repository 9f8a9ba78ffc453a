//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::config::SessionLimits;
use crate::evaluator::{IncorrectReason, PartialCredit, Value, Verdict};
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_question(n: u32) -> Question {
    Question {
        id: format!("q{n}"),
        prompt: "What is -1/7 times 1?".into(),
        answer: "-1/7".into(),
        alternates: vec![],
        hints: vec!["Sign dekho".into(), "Multiply by one".into()],
        solution: "-1/7".into(),
        topic: "rational numbers".into(),
        teaching: vec!["m0".into(), "m1".into(), "m2".into()],
    }
}

fn test_context(state: State) -> SessionContext {
    let mut ctx = SessionContext::new("prop", "rational numbers", Utc::now());
    ctx.state = state;
    ctx
}

/// Run one turn end to end: route, resolve a pending verdict, apply, and
/// install a fresh question when the transition asked for one.
fn drive(
    ctx: &mut SessionContext,
    intent: &Intent,
    verdict: &Verdict,
    limits: &SessionLimits,
) -> Transition {
    let mut t = transition(ctx.state, intent, ctx, limits);
    if t.is_pending() {
        t = after_verdict(verdict, ctx, limits).expect("pending implies an active question");
    }
    ctx.apply(&t).expect("resolved transitions always apply");
    if ctx.question.is_none() && !ctx.state.is_terminal() {
        ctx.install_question(test_question(ctx.questions_asked));
    }
    t
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = State> {
    proptest::sample::select(State::ALL.to_vec())
}

fn arb_live_state() -> impl Strategy<Value = State> {
    arb_state().prop_filter("live", |s| !s.is_terminal())
}

fn arb_category() -> impl Strategy<Value = IntentCategory> {
    proptest::sample::select(IntentCategory::ALL.to_vec())
}

fn arb_language() -> impl Strategy<Value = Language> {
    proptest::sample::select(Language::ALL.to_vec())
}

fn arb_intent() -> impl Strategy<Value = Intent> {
    (arb_category(), arb_language()).prop_map(|(category, language)| {
        let intent = Intent::new(category, 0.9);
        match category {
            IntentCategory::LanguageSwitch => intent.with_detail(IntentDetail::Language {
                language,
                topic: None,
            }),
            IntentCategory::MetaQuestion => intent.with_detail(IntentDetail::Meta {
                topic: MetaTopic::Progress,
            }),
            _ => intent,
        }
    })
}

/// Anything except an explicit language request
fn arb_plain_intent() -> impl Strategy<Value = Intent> {
    arb_intent().prop_filter("no language switch", |i| {
        i.category != IntentCategory::LanguageSwitch
    })
}

fn arb_verdict() -> impl Strategy<Value = Verdict> {
    prop_oneof![
        Just(Verdict::Correct { parsed: None }),
        Just(Verdict::Partial {
            parsed: Value::from_ratio(1, 7),
            credit: PartialCredit::SignFlipped,
        }),
        Just(Verdict::Incorrect {
            parsed: Some(Value::from_ratio(3, 1)),
            reason: IncorrectReason::Wrong,
        }),
    ]
}

fn arb_context() -> impl Strategy<Value = SessionContext> {
    (
        arb_state(),
        arb_language(),
        0u8..3,
        0u8..=2,
        0u8..4,
        0u32..10,
        any::<bool>(),
        proptest::option::of(arb_live_state()),
    )
        .prop_map(
            |(state, language, reteach, hint, unclear, asked, has_question, resume)| {
                let mut ctx = test_context(state);
                ctx.language = language;
                ctx.reteach_count = reteach;
                ctx.unclear_count = unclear;
                ctx.resume_state = resume;
                if has_question {
                    ctx.install_question(test_question(asked));
                }
                ctx.questions_asked = asked;
                ctx.hint_level = hint;
                ctx
            },
        )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Invariant 1: every (state, intent) pair yields a transition, and only
    // answer attempts against an active question wait on a verdict
    #[test]
    fn prop_transition_is_total(ctx in arb_context(), intent in arb_intent()) {
        let limits = SessionLimits::default();
        let t = transition(ctx.state, &intent, &ctx, &limits);
        if t.is_pending() {
            prop_assert_eq!(intent.category, IntentCategory::AnswerAttempt);
            prop_assert!(ctx.question.is_some());
            prop_assert!(matches!(
                ctx.state,
                State::Teaching | State::AwaitingAnswer | State::Hinting
            ));
            prop_assert_eq!(t.action, Action::Evaluate);
        } else {
            prop_assert!(t.next_state().is_some());
        }
    }

    // Invariant 2: stop ends the session from every live state
    #[test]
    fn prop_stop_is_universal(ctx in arb_context()) {
        let t = transition(ctx.state, &Intent::new(IntentCategory::Stop, 0.95), &ctx, &SessionLimits::default());
        prop_assert_eq!(t.next_state(), Some(State::SessionEnd));
    }

    // Invariant 3: the session end state absorbs every intent
    #[test]
    fn prop_session_end_is_absorbing(ctx in arb_context(), intent in arb_intent()) {
        let t = transition(State::SessionEnd, &intent, &ctx, &SessionLimits::default());
        prop_assert_eq!(t.next_state(), Some(State::SessionEnd));
        prop_assert_eq!(t.action, Action::Farewell);
    }

    // Invariant 4: a chosen language survives any later turns that do not
    // ask for a different one
    #[test]
    fn prop_language_persists(
        language in arb_language(),
        intents in proptest::collection::vec(arb_plain_intent(), 0..30),
        verdicts in proptest::collection::vec(arb_verdict(), 30),
    ) {
        let limits = SessionLimits::default();
        let mut ctx = test_context(State::Teaching);
        ctx.install_question(test_question(0));
        let switch = Intent::new(IntentCategory::LanguageSwitch, 0.95).with_detail(
            IntentDetail::Language { language, topic: None },
        );
        drive(&mut ctx, &switch, &verdicts[0], &limits);
        prop_assert_eq!(ctx.language, language);

        for (intent, verdict) in intents.iter().zip(&verdicts) {
            drive(&mut ctx, intent, verdict, &limits);
            prop_assert_eq!(ctx.language, language);
        }
    }

    // Invariant 5: teaching cannot loop forever on confusion
    #[test]
    fn prop_teaching_cannot_starve(
        requests in proptest::collection::vec(
            prop_oneof![
                Just(IntentCategory::DontKnow),
                Just(IntentCategory::ConceptRequest),
                Just(IntentCategory::Repeat),
            ],
            10,
        ),
    ) {
        let limits = SessionLimits::default();
        let mut ctx = test_context(State::Teaching);
        ctx.install_question(test_question(0));
        let verdict = Verdict::Correct { parsed: None };

        let mut stayed = 0u8;
        for category in requests {
            drive(&mut ctx, &Intent::new(category, 0.95), &verdict, &limits);
            if ctx.state != State::Teaching {
                break;
            }
            stayed += 1;
        }
        prop_assert!(stayed < limits.max_reteach, "stayed in teaching for {stayed} turns");
        prop_assert_eq!(ctx.state, State::AwaitingAnswer);
    }

    // Invariant 6: counters stay within their bounds on any walk
    #[test]
    fn prop_counters_stay_bounded(
        intents in proptest::collection::vec(arb_intent(), 0..40),
        verdicts in proptest::collection::vec(arb_verdict(), 40),
    ) {
        let limits = SessionLimits::default();
        let mut ctx = test_context(State::Greeting);
        let mut last_score = 0;
        for (intent, verdict) in intents.iter().zip(&verdicts) {
            drive(&mut ctx, intent, verdict, &limits);
            prop_assert!(ctx.hint_level <= 2);
            prop_assert!(ctx.reteach_count < limits.max_reteach);
            prop_assert!(ctx.questions_asked <= limits.max_questions);
            prop_assert!(ctx.score >= last_score);
            prop_assert!(ctx.score <= ctx.attempts);
            last_score = ctx.score;
            if matches!(ctx.state, State::AwaitingAnswer | State::Hinting | State::Explaining) {
                prop_assert!(ctx.question.is_some());
            }
        }
    }

    // Invariant 7: the same inputs always route the same way
    #[test]
    fn prop_transition_is_deterministic(ctx in arb_context(), intent in arb_intent()) {
        let limits = SessionLimits::default();
        let first = transition(ctx.state, &intent, &ctx, &limits);
        let second = transition(ctx.state, &intent, &ctx, &limits);
        prop_assert_eq!(first, second);
    }
}
