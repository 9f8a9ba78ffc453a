//! Property-based tests for request translation and reply normalization

use super::anthropic::*;
use super::types::*;
use proptest::prelude::*;
use std::time::Duration;

fn arb_turn() -> impl Strategy<Value = PriorTurn> {
    (any::<bool>(), "[a-zA-Z ]{1,30}").prop_map(|(student, text)| {
        if student {
            PriorTurn::student(text)
        } else {
            PriorTurn::tutor(text)
        }
    })
}

fn generator() -> AnthropicGenerator {
    AnthropicGenerator::new("k".into(), AnthropicModel::default(), Duration::from_secs(1)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Translated messages start with the user and strictly alternate
    #[test]
    fn prop_translate_alternates_roles(
        turns in proptest::collection::vec(arb_turn(), 0..12),
        directive in "[a-zA-Z ]{1,40}",
    ) {
        let request = GenerationRequest::new("system", directive.clone()).with_prior_turns(turns);
        let value = generator().translated_json(&request);
        let messages = value["messages"].as_array().unwrap();
        prop_assert!(!messages.is_empty());
        prop_assert_eq!(messages[0]["role"].as_str(), Some("user"));
        for pair in messages.windows(2) {
            prop_assert_ne!(&pair[0]["role"], &pair[1]["role"]);
        }
        let last = messages.last().unwrap();
        prop_assert_eq!(last["role"].as_str(), Some("user"));
        let text = last["content"][0]["text"].as_str().unwrap();
        prop_assert!(text.ends_with(&directive));
    }

    /// Every prior line survives translation
    #[test]
    fn prop_translate_preserves_text(turns in proptest::collection::vec(arb_turn(), 0..12)) {
        let request = GenerationRequest::new("system", "now").with_prior_turns(turns.clone());
        let value = generator().translated_json(&request);
        let joined: String = value["messages"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|m| m["content"][0]["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        for turn in &turns {
            prop_assert!(joined.contains(&turn.text));
        }
    }

    /// A reply normalizes to non-empty trimmed text or a malformed error
    #[test]
    fn prop_normalize_ok_implies_nonempty(
        pieces in proptest::collection::vec("[ a-z]{0,8}", 0..4),
    ) {
        let body = serde_json::json!({
            "content": pieces.iter().map(|p| serde_json::json!({"type": "text", "text": p})).collect::<Vec<_>>(),
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1},
        });
        match AnthropicGenerator::normalize_body(&body.to_string()) {
            Ok(generation) => {
                prop_assert!(!generation.text.is_empty());
                prop_assert_eq!(generation.text.trim(), generation.text.as_str());
            }
            Err(e) => {
                prop_assert_eq!(e.kind, super::GenerationErrorKind::Malformed);
                prop_assert!(pieces.concat().trim().is_empty());
            }
        }
    }
}
