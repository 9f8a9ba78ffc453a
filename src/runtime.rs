//! Session runtime
//!
//! Owns live sessions and runs one turn at a time per session. Sessions are
//! independent; a turn for one never waits on another.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{SessionRuntime, TurnOutcome};
pub use traits::*;

use crate::config::TutorConfig;
use crate::llm::Generator;
use crate::state_machine::{SessionContext, TransitionError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Turns replayed to the generator and reloaded on resume
const HISTORY_TURNS: usize = 3;

/// Errors surfaced to the caller of a turn. Generation problems never
/// appear here; they end in the safe fallback.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Session {0} is already processing a turn")]
    SessionBusy(String),
    #[error("Session {0} has ended")]
    SessionEnded(String),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Turn cancelled")]
    Cancelled,
}

/// Everything a runtime talks to, injected at construction
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn SessionStore>,
    pub generator: Arc<dyn Generator>,
    pub questions: Arc<dyn QuestionSource>,
    /// Optional; without it ambiguous input goes to the word-count heuristic
    pub intent_model: Option<Arc<dyn IntentModel>>,
    pub speaker: Arc<dyn Speaker>,
}

/// Manager for all live sessions
pub struct SessionManager {
    collaborators: Collaborators,
    config: Arc<TutorConfig>,
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionRuntime>>>>,
}

impl SessionManager {
    pub fn new(collaborators: Collaborators, config: Arc<TutorConfig>) -> Self {
        Self {
            collaborators,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session on `topic` and deliver the greeting
    pub async fn start_session(
        &self,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, String), TurnError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let ctx = SessionContext::new(&session_id, topic, chrono::Utc::now());
        self.collaborators
            .store
            .create_session(&ctx)
            .await
            .map_err(TurnError::Storage)?;

        let mut runtime =
            SessionRuntime::new(ctx, self.collaborators.clone(), Arc::clone(&self.config));
        let greeting = runtime.greet(cancel).await?;

        tracing::info!(session_id = %session_id, topic = %topic, "Session started");
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(runtime)));
        Ok((session_id, greeting))
    }

    /// Bring a stored session back into memory
    pub async fn resume_session(&self, session_id: &str) -> Result<(), TurnError> {
        if self.sessions.read().await.contains_key(session_id) {
            return Ok(());
        }
        let store = &self.collaborators.store;
        let ctx = store
            .load_session(session_id)
            .await
            .map_err(TurnError::Storage)?
            .ok_or_else(|| TurnError::SessionNotFound(session_id.to_string()))?;
        if ctx.state.is_terminal() {
            return Err(TurnError::SessionEnded(session_id.to_string()));
        }
        let history = store
            .recent_turns(session_id, HISTORY_TURNS)
            .await
            .map_err(TurnError::Storage)?;

        let runtime = SessionRuntime::new(ctx, self.collaborators.clone(), Arc::clone(&self.config))
            .with_history(&history);
        tracing::info!(
            session_id = %session_id,
            state = %runtime.context().state,
            "Session resumed"
        );
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(runtime)));
        Ok(())
    }

    /// Run one turn. A session already mid-turn rejects the second caller.
    pub async fn run_turn(
        &self,
        session_id: &str,
        transcript: &crate::classifier::Transcript,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| TurnError::SessionNotFound(session_id.to_string()))?;

        let Ok(mut guard) = handle.try_lock() else {
            tracing::warn!(session_id = %session_id, "Rejected concurrent turn");
            return Err(TurnError::SessionBusy(session_id.to_string()));
        };
        guard.run_turn(transcript, cancel).await
    }

    /// Drop a session from memory; its stored record is untouched
    pub async fn close_session(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
