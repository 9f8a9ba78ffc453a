//! Database schema and records

use crate::enforcer::Rule;
use crate::evaluator::Verdict;
use crate::state_machine::{Action, Intent, SessionContext, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    topic TEXT NOT NULL,
    state TEXT NOT NULL,
    context TEXT NOT NULL,
    turn_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC);

CREATE TABLE IF NOT EXISTS turns (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    student_text TEXT NOT NULL,
    intent TEXT NOT NULL,
    state_before TEXT NOT NULL,
    state_after TEXT NOT NULL,
    action TEXT NOT NULL,
    verdict TEXT,
    tutor_text TEXT NOT NULL,
    violations TEXT NOT NULL,
    used_fallback BOOLEAN NOT NULL,
    created_at TEXT NOT NULL,

    UNIQUE (session_id, sequence_id),
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, sequence_id);
";

/// Session row: the state column and the snapshot are written together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub topic: String,
    pub state: State,
    pub context: SessionContext,
    pub turn_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A completed turn, as handed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTurn {
    pub student_text: String,
    pub intent: Intent,
    pub state_before: State,
    pub state_after: State,
    pub action: Action,
    pub verdict: Option<Verdict>,
    /// Exactly what the student heard
    pub tutor_text: String,
    pub violations: Vec<Rule>,
    pub used_fallback: bool,
}

/// A turn as stored in the append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_id: String,
    pub session_id: String,
    pub sequence_id: i64,
    #[serde(flatten)]
    pub turn: NewTurn,
    pub created_at: DateTime<Utc>,
}
