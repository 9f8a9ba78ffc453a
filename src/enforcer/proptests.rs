//! Property-based tests for output enforcement

use super::*;
use proptest::prelude::*;

const CLEAN_WORDS: &[&str] = &[
    "chalo", "sign", "dekho", "number", "upar", "neeche", "wala", "hai", "ab", "socho",
];

const NOISY_WORDS: &[&str] = &[
    "chalo", "sign", "dekho", "matlab", "rule", "1/2", "-3/4", "shabash", "excellent", "kya",
    "hai", "perfect",
];

fn arb_sentence(words: &'static [&'static str]) -> impl Strategy<Value = String> {
    (
        proptest::collection::vec(proptest::sample::select(words), 1..6),
        prop_oneof![Just("."), Just("?"), Just("!")],
    )
        .prop_map(|(words, end)| format!("{}{end}", words.join(" ")))
}

fn arb_text(words: &'static [&'static str], max_sentences: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(arb_sentence(words), 1..=max_sentences).prop_map(|s| s.join(" "))
}

fn arb_verdict() -> impl Strategy<Value = Option<Verdict>> {
    use crate::evaluator::{IncorrectReason, PartialCredit, Value};
    prop_oneof![
        Just(None),
        Just(Some(Verdict::Partial {
            parsed: Value::from_ratio(1, 2),
            credit: PartialCredit::SignFlipped,
        })),
        Just(Some(Verdict::Incorrect {
            parsed: None,
            reason: IncorrectReason::Unparseable,
        })),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Text that breaks no rule comes back byte-for-byte
    #[test]
    fn clean_text_is_untouched(text in arb_text(CLEAN_WORDS, 2)) {
        let ctx = EnforceContext::new(State::Teaching, Language::Hinglish);
        let result = enforce(&text, &ctx);
        prop_assert!(result.passed, "{text:?} -> {:?}", result.violations);
        prop_assert_eq!(result.text, text);
    }

    /// A second pass over repaired text changes nothing
    #[test]
    fn repair_is_idempotent(text in arb_text(NOISY_WORDS, 3), verdict in arb_verdict()) {
        let ctx = EnforceContext::new(State::Teaching, Language::Hinglish)
            .with_verdict(verdict.as_ref());
        let first = enforce(&text, &ctx);
        let second = enforce(&first.text, &ctx);
        prop_assert_eq!(&second.text, &first.text);
        prop_assert!(
            !second.violations.iter().any(|r| matches!(r, Rule::Length | Rule::FalsePraise | Rule::TtsUnsafe)),
            "{:?} -> {:?}", first.text, second.violations
        );
    }

    /// Without a correct verdict no praise survives
    #[test]
    fn praise_never_survives_a_wrong_answer(text in arb_text(NOISY_WORDS, 3), verdict in arb_verdict()) {
        let ctx = EnforceContext::new(State::AwaitingAnswer, Language::Hinglish)
            .with_verdict(verdict.as_ref());
        let result = enforce(&text, &ctx).text.to_lowercase();
        for praise in ["shabash", "excellent", "perfect"] {
            prop_assert!(!result.contains(praise), "{result:?}");
        }
    }

    /// Output never exceeds the configured ceiling
    #[test]
    fn output_respects_limits(text in arb_text(NOISY_WORDS, 6)) {
        let ctx = EnforceContext::new(State::Teaching, Language::Hinglish);
        let result = enforce(&text, &ctx);
        prop_assert!(rules::split_sentences(&result.text).len() <= ctx.limits.max_sentences);
        prop_assert!(result.text.split_whitespace().count() <= ctx.limits.max_words);
    }
}
