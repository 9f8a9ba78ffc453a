//! Common types for generation requests

use serde::{Deserialize, Serialize};

/// One generation request: who the tutor is, what to say now, and what
/// was said recently
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub directive: String,
    pub prior_turns: Vec<PriorTurn>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, directive: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            directive: directive.into(),
            prior_turns: Vec::new(),
            max_tokens: None,
        }
    }

    pub fn with_prior_turns(mut self, turns: Vec<PriorTurn>) -> Self {
        self.prior_turns = turns;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Speaker of a prior turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Student,
    Tutor,
}

/// A line of recent dialogue replayed to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorTurn {
    pub role: TurnRole,
    pub text: String,
}

impl PriorTurn {
    pub fn student(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Student,
            text: text.into(),
        }
    }

    pub fn tutor(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Tutor,
            text: text.into(),
        }
    }
}

/// Generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: Usage::default(),
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
