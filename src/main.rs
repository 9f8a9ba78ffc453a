//! Tutor core - decision engine for a spoken tutoring dialogue
//!
//! Reads one transcript per line from stdin, runs it through the session
//! runtime and speaks the tutor's reply to the console.

mod classifier;
mod config;
mod content;
mod db;
mod enforcer;
mod evaluator;
mod instruction;
mod llm;
mod runtime;
mod speech;
mod state_machine;

use classifier::Transcript;
use config::TutorConfig;
use content::QuestionBank;
use db::Database;
use llm::{AnthropicGenerator, AnthropicModel, Generator, LoggingGenerator};
use runtime::{
    Collaborators, ConsoleSpeaker, DatabaseStorage, GeneratorIntentModel, SessionManager,
    TurnError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_TOPIC: &str = "rational numbers";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the dialogue
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = Arc::new(TutorConfig::from_env()?);

    let db = match &config.db_path {
        Some(path) => {
            if let Some(parent) = PathBuf::from(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path, "Opening database");
            Database::open(path)?
        }
        None => {
            tracing::warn!("TUTOR_DB_PATH not set, sessions will not survive a restart");
            Database::open_in_memory()?
        }
    };

    let Some(api_key) = config.anthropic_api_key.clone() else {
        return Err("ANTHROPIC_API_KEY is not set".into());
    };
    let model = match config.model.as_deref() {
        Some(id) => AnthropicModel::from_id(id).ok_or_else(|| format!("Unknown model: {id}"))?,
        None => AnthropicModel::default(),
    };
    let generator: Arc<dyn Generator> = Arc::new(LoggingGenerator::new(Arc::new(
        AnthropicGenerator::new(api_key, model, config.generation_timeout)?,
    )));
    tracing::info!(model = %generator.model_id(), "Generator initialized");

    let bank = QuestionBank::load_or_seed(config.content_path.as_deref().map(Path::new))?;
    tracing::info!(
        questions = bank.question_count(),
        topics = ?bank.topics(),
        "Question bank ready"
    );

    let collaborators = Collaborators {
        store: Arc::new(DatabaseStorage::new(db)),
        generator: Arc::clone(&generator),
        questions: Arc::new(bank),
        intent_model: Some(Arc::new(GeneratorIntentModel::new(generator))),
        speaker: Arc::new(ConsoleSpeaker),
    };
    let manager = SessionManager::new(collaborators, Arc::clone(&config));

    let topic = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let (session_id, _greeting) = manager
        .start_session(&topic, &CancellationToken::new())
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let cancel = CancellationToken::new();
        let transcript = Transcript::text(line);
        let turn = manager.run_turn(&session_id, &transcript, &cancel);
        tokio::pin!(turn);

        let result = tokio::select! {
            r = &mut turn => r,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                turn.await
            }
        };

        match result {
            Ok(outcome) if outcome.state.is_terminal() => break,
            Ok(_) => {}
            Err(TurnError::Cancelled) => {
                tracing::info!(session_id = %session_id, "Turn cancelled by user");
                break;
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Turn failed");
            }
        }
    }

    manager.close_session(&session_id).await;
    tracing::info!(session_id = %session_id, "Session closed");
    Ok(())
}
