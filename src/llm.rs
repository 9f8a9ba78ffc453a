//! Utterance generation
//!
//! Provides a common interface for the model that phrases tutor replies.

mod anthropic;
mod error;
mod types;

#[cfg(test)]
mod proptests;

pub use anthropic::{AnthropicGenerator, AnthropicModel};
pub use error::{GenerationError, GenerationErrorKind};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for text generators
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce one candidate reply
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for generators
pub struct LoggingGenerator {
    inner: Arc<dyn Generator>,
    model_id: String,
}

impl LoggingGenerator {
    pub fn new(inner: Arc<dyn Generator>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl Generator for LoggingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(generation) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = generation.usage.input_tokens,
                    output_tokens = generation.usage.output_tokens,
                    "Generation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Generation failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
