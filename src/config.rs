//! Runtime configuration
//!
//! Every tunable is read from the environment once at startup. Missing
//! variables fall back to defaults; present-but-invalid values are errors.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Limits that shape the dialogue state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionLimits {
    /// Reteach attempts before the machine forces a question
    pub max_reteach: u8,
    /// Questions asked before the session completes
    pub max_questions: u32,
    pub session_timeout: Duration,
    /// Tolerance applied when either side of a comparison is a decimal
    pub decimal_tolerance: f64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_reteach: 3,
            max_questions: 10,
            session_timeout: Duration::from_secs(30 * 60),
            decimal_tolerance: 0.01,
        }
    }
}

/// Limits applied by the output enforcer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcerLimits {
    pub max_words: usize,
    pub max_sentences: usize,
}

impl Default for EnforcerLimits {
    fn default() -> Self {
        Self {
            max_words: 40,
            max_sentences: 2,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub session: SessionLimits,
    pub enforcer: EnforcerLimits,
    /// Generation attempts per turn before the safe fallback is used
    pub max_generation_attempts: u32,
    pub generation_timeout: Duration,
    pub classifier_timeout: Duration,
    pub stt_confidence_threshold: f32,
    pub db_path: Option<String>,
    pub content_path: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub model: Option<String>,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            session: SessionLimits::default(),
            enforcer: EnforcerLimits::default(),
            max_generation_attempts: 3,
            generation_timeout: Duration::from_secs(20),
            classifier_timeout: Duration::from_secs(5),
            stt_confidence_threshold: 0.4,
            db_path: None,
            content_path: None,
            anthropic_api_key: None,
            model: None,
        }
    }
}

impl TutorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let session = SessionLimits {
            max_reteach: parse_or(&lookup, "TUTOR_MAX_RETEACH", defaults.session.max_reteach)?,
            max_questions: parse_or(
                &lookup,
                "TUTOR_MAX_QUESTIONS",
                defaults.session.max_questions,
            )?,
            session_timeout: minutes_or(&lookup, "TUTOR_SESSION_TIMEOUT_MINUTES", 30)?,
            decimal_tolerance: parse_or(
                &lookup,
                "TUTOR_DECIMAL_TOLERANCE",
                defaults.session.decimal_tolerance,
            )?,
        };
        let enforcer = EnforcerLimits {
            max_words: parse_or(
                &lookup,
                "TUTOR_MAX_RESPONSE_WORDS",
                defaults.enforcer.max_words,
            )?,
            max_sentences: parse_or(
                &lookup,
                "TUTOR_MAX_RESPONSE_SENTENCES",
                defaults.enforcer.max_sentences,
            )?,
        };

        Ok(Self {
            session,
            enforcer,
            max_generation_attempts: parse_or(
                &lookup,
                "TUTOR_MAX_ENFORCE_RETRIES",
                defaults.max_generation_attempts,
            )?
            .max(1),
            generation_timeout: Duration::from_secs(parse_or(
                &lookup,
                "TUTOR_GENERATION_TIMEOUT_SECS",
                20u64,
            )?),
            classifier_timeout: Duration::from_secs(parse_or(
                &lookup,
                "TUTOR_CLASSIFIER_TIMEOUT_SECS",
                5u64,
            )?),
            stt_confidence_threshold: parse_or(
                &lookup,
                "TUTOR_STT_CONFIDENCE_THRESHOLD",
                defaults.stt_confidence_threshold,
            )?,
            db_path: lookup("TUTOR_DB_PATH"),
            content_path: lookup("TUTOR_CONTENT_PATH"),
            anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
            model: lookup("TUTOR_MODEL"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

/// Whole minutes; a value too large to hold in seconds is invalid
fn minutes_or<F>(lookup: &F, var: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let minutes = parse_or(lookup, var, default)?;
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: minutes.to_string(),
        })
}
