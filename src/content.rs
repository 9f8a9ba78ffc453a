//! Question bank
//!
//! Questions come from a JSON file when one is configured, otherwise from
//! the seed set compiled into the binary.

use crate::state_machine::Question;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SEED_QUESTIONS: &str = include_str!("../content/seed_questions.json");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid question bank: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Question bank has no questions")]
    Empty,
    #[error("Duplicate question id: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Deserialize)]
struct BankFile {
    questions: Vec<Question>,
}

/// In-memory question bank, in presentation order
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Built-in rational-numbers set
    pub fn seed() -> Result<Self, ContentError> {
        Self::from_json(SEED_QUESTIONS)
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            questions = bank.question_count(),
            "Loaded question bank"
        );
        Ok(bank)
    }

    /// Load from `path` when given, else fall back to the seed set
    pub fn load_or_seed(path: Option<&Path>) -> Result<Self, ContentError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::seed(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ContentError> {
        let file: BankFile = serde_json::from_str(raw)?;
        Self::new(file.questions)
    }

    pub fn new(questions: Vec<Question>) -> Result<Self, ContentError> {
        if questions.is_empty() {
            return Err(ContentError::Empty);
        }
        for (i, q) in questions.iter().enumerate() {
            if questions.iter().skip(i + 1).any(|other| other.id == q.id) {
                return Err(ContentError::DuplicateId(q.id.clone()));
            }
        }
        Ok(Self { questions })
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// First question on `topic` that has not been asked yet
    pub fn next_question(&self, topic: &str, asked_ids: &[String]) -> Option<Question> {
        self.questions
            .iter()
            .filter(|q| q.topic.eq_ignore_ascii_case(topic.trim()))
            .find(|q| !asked_ids.contains(&q.id))
            .cloned()
    }

    /// Distinct topics, in first-seen order
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::new();
        for q in &self.questions {
            if !topics.contains(&q.topic.as_str()) {
                topics.push(&q.topic);
            }
        }
        topics
    }
}
