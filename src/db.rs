//! Session persistence
//!
//! One row per session holds the dialogue state next to the context
//! snapshot it describes; turns go to an append-only log. Both change in a
//! single transaction per turn.

mod schema;

pub use schema::*;

use crate::state_machine::{SessionContext, State};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session {session_id} has an unreadable state: {value:?}")]
    InvalidState { session_id: String, value: String },
    #[error("Session {session_id} state column {column} disagrees with snapshot {snapshot}")]
    SplitBrain {
        session_id: String,
        column: State,
        snapshot: State,
    },
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Insert a fresh session
    pub fn create_session(&self, ctx: &SessionContext) -> DbResult<SessionRecord> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO sessions (id, topic, state, context, turn_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![
                ctx.session_id,
                ctx.topic,
                ctx.state.as_str(),
                serde_json::to_string(ctx)?,
                now.to_rfc3339()
            ],
        )?;

        Ok(SessionRecord {
            id: ctx.session_id.clone(),
            topic: ctx.topic.clone(),
            state: ctx.state,
            context: ctx.clone(),
            turn_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Load a session, refusing snapshots that disagree with their state
    pub fn get_session(&self, id: &str) -> DbResult<SessionRecord> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, topic, state, context, turn_count, created_at, updated_at
                 FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;
        drop(conn);

        let (id, topic, state, context, turn_count, created_at, updated_at) = row;
        let state: State = state.parse().map_err(|_| DbError::InvalidState {
            session_id: id.clone(),
            value: state.clone(),
        })?;
        let context: SessionContext = serde_json::from_str(&context)?;
        if !context.is_consistent_with(state) {
            return Err(DbError::SplitBrain {
                session_id: id,
                column: state,
                snapshot: context.state,
            });
        }

        Ok(SessionRecord {
            id,
            topic,
            state,
            context,
            turn_count,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }

    /// Append a turn and replace the snapshot in one transaction
    pub fn save_turn(&self, ctx: &SessionContext, turn: &NewTurn) -> DbResult<TurnRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let sequence_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM turns WHERE session_id = ?1",
            params![ctx.session_id],
            |row| row.get(0),
        )?;

        let updated = tx.execute(
            "UPDATE sessions SET state = ?1, context = ?2, turn_count = turn_count + 1, updated_at = ?3
             WHERE id = ?4",
            params![
                ctx.state.as_str(),
                serde_json::to_string(ctx)?,
                now.to_rfc3339(),
                ctx.session_id
            ],
        )?;
        if updated == 0 {
            return Err(DbError::SessionNotFound(ctx.session_id.clone()));
        }

        let turn_id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO turns (id, session_id, sequence_id, student_text, intent, state_before,
                                state_after, action, verdict, tutor_text, violations, used_fallback, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                turn_id,
                ctx.session_id,
                sequence_id,
                turn.student_text,
                serde_json::to_string(&turn.intent)?,
                turn.state_before.as_str(),
                turn.state_after.as_str(),
                serde_json::to_string(&turn.action)?,
                turn.verdict.as_ref().map(serde_json::to_string).transpose()?,
                turn.tutor_text,
                serde_json::to_string(&turn.violations)?,
                turn.used_fallback,
                now.to_rfc3339()
            ],
        )?;
        tx.commit()?;

        Ok(TurnRecord {
            turn_id,
            session_id: ctx.session_id.clone(),
            sequence_id,
            turn: turn.clone(),
            created_at: now,
        })
    }

    // ==================== Turn Operations ====================

    /// Every turn of a session in order
    #[allow(dead_code)] // For transcript export
    pub fn get_turns(&self, session_id: &str) -> DbResult<Vec<TurnRecord>> {
        self.query_turns(
            "SELECT id, session_id, sequence_id, student_text, intent, state_before, state_after,
                    action, verdict, tutor_text, violations, used_fallback, created_at
             FROM turns WHERE session_id = ?1 ORDER BY sequence_id ASC",
            session_id,
            None,
        )
    }

    /// The latest `limit` turns, oldest first
    pub fn get_recent_turns(&self, session_id: &str, limit: usize) -> DbResult<Vec<TurnRecord>> {
        let mut turns = self.query_turns(
            "SELECT id, session_id, sequence_id, student_text, intent, state_before, state_after,
                    action, verdict, tutor_text, violations, used_fallback, created_at
             FROM turns WHERE session_id = ?1 ORDER BY sequence_id DESC LIMIT ?2",
            session_id,
            Some(limit),
        )?;
        turns.reverse();
        Ok(turns)
    }

    fn query_turns(
        &self,
        sql: &str,
        session_id: &str,
        limit: Option<usize>,
    ) -> DbResult<Vec<TurnRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = match limit {
            Some(limit) => {
                let limit = i64::try_from(limit).unwrap_or(i64::MAX);
                stmt.query_map(params![session_id, limit], read_turn_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => stmt
                .query_map(params![session_id], read_turn_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        rows.into_iter().map(RawTurn::decode).collect()
    }
}

/// Turn columns before JSON decoding
struct RawTurn {
    turn_id: String,
    session_id: String,
    sequence_id: i64,
    student_text: String,
    intent: String,
    state_before: String,
    state_after: String,
    action: String,
    verdict: Option<String>,
    tutor_text: String,
    violations: String,
    used_fallback: bool,
    created_at: String,
}

fn read_turn_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTurn> {
    Ok(RawTurn {
        turn_id: row.get(0)?,
        session_id: row.get(1)?,
        sequence_id: row.get(2)?,
        student_text: row.get(3)?,
        intent: row.get(4)?,
        state_before: row.get(5)?,
        state_after: row.get(6)?,
        action: row.get(7)?,
        verdict: row.get(8)?,
        tutor_text: row.get(9)?,
        violations: row.get(10)?,
        used_fallback: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl RawTurn {
    fn decode(self) -> DbResult<TurnRecord> {
        let parse_state = |value: &str| {
            value.parse::<State>().map_err(|_| DbError::InvalidState {
                session_id: self.session_id.clone(),
                value: value.to_string(),
            })
        };
        let state_before = parse_state(&self.state_before)?;
        let state_after = parse_state(&self.state_after)?;

        Ok(TurnRecord {
            turn_id: self.turn_id,
            sequence_id: self.sequence_id,
            turn: NewTurn {
                student_text: self.student_text,
                intent: serde_json::from_str(&self.intent)?,
                state_before,
                state_after,
                action: serde_json::from_str(&self.action)?,
                verdict: self
                    .verdict
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()?,
                tutor_text: self.tutor_text,
                violations: serde_json::from_str(&self.violations)?,
                used_fallback: self.used_fallback,
            },
            created_at: parse_datetime(&self.created_at),
            session_id: self.session_id,
        })
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
