//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::classifier::parse_model_output;
use crate::content::QuestionBank;
use crate::db::{Database, DbError, NewTurn, TurnRecord};
use crate::llm::{GenerationRequest, Generator};
use crate::state_machine::{Intent, Language, Question, SessionContext, State};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for session snapshots and the turn log
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly created session
    async fn create_session(&self, ctx: &SessionContext) -> Result<(), String>;

    /// Load a session snapshot; `None` when the id is unknown
    async fn load_session(&self, session_id: &str) -> Result<Option<SessionContext>, String>;

    /// Append a turn and replace the snapshot atomically
    async fn save_turn(&self, ctx: &SessionContext, turn: &NewTurn) -> Result<(), String>;

    /// The latest turns, oldest first
    async fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<TurnRecord>, String>;
}

/// Supplier of questions
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Next unasked question on `topic`, or `None` when the topic is exhausted
    async fn next_question(&self, topic: &str, asked_ids: &[String]) -> Option<Question>;
}

/// Model-backed classifier for input the patterns cannot place
#[async_trait]
pub trait IntentModel: Send + Sync {
    async fn classify(&self, utterance: &str, state: State) -> Result<Intent, String>;
}

/// Text-to-speech output
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str, language: Language) -> Result<(), String>;
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a `SessionStore`
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DatabaseStorage {
    async fn create_session(&self, ctx: &SessionContext) -> Result<(), String> {
        self.db
            .create_session(ctx)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionContext>, String> {
        match self.db.get_session(session_id) {
            Ok(record) => Ok(Some(record.context)),
            Err(DbError::SessionNotFound(_)) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn save_turn(&self, ctx: &SessionContext, turn: &NewTurn) -> Result<(), String> {
        self.db
            .save_turn(ctx, turn)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn recent_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, String> {
        self.db
            .get_recent_turns(session_id, limit)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl QuestionSource for QuestionBank {
    async fn next_question(&self, topic: &str, asked_ids: &[String]) -> Option<Question> {
        QuestionBank::next_question(self, topic, asked_ids)
    }
}

const CLASSIFIER_PROMPT: &str = r#"You classify one utterance from a Class 8 student in a spoken maths lesson. The student may speak Hindi, English or Hinglish.

Reply with only a JSON object: {"category": "<category>", "confidence": <0.0 to 1.0>}

Categories:
- acknowledge: agrees or signals readiness ("haan", "okay", "samajh gaya")
- dont_know: says they do not know
- answer_attempt: tries to answer the question
- concept_request: asks for an explanation
- comfort: sounds upset, tired or scared
- stop: wants to end the session
- repeat: asks to hear it again
- unintelligible: none of the above or meaningless"#;

/// Adapter to use a `Generator` as the model classifier
pub struct GeneratorIntentModel {
    generator: Arc<dyn Generator>,
}

impl GeneratorIntentModel {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl IntentModel for GeneratorIntentModel {
    async fn classify(&self, utterance: &str, state: State) -> Result<Intent, String> {
        let request = GenerationRequest::new(
            CLASSIFIER_PROMPT,
            format!("Lesson phase: {state}\nUtterance: \"{utterance}\""),
        )
        .with_max_tokens(60);
        let generation = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| e.to_string())?;
        parse_model_output(&generation.text)
            .ok_or_else(|| format!("Unusable classifier reply: {:?}", generation.text))
    }
}

/// Prints spoken text to stdout
pub struct ConsoleSpeaker;

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn speak(&self, text: &str, language: Language) -> Result<(), String> {
        println!("[{language}] {text}");
        Ok(())
    }
}
