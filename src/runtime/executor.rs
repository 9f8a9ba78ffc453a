//! Per-session turn pipeline

use super::{Collaborators, TurnError, HISTORY_TURNS};
use crate::classifier::{classify_fast, heuristic_fallback, FastPath, Transcript};
use crate::config::TutorConfig;
use crate::db::{NewTurn, TurnRecord};
use crate::enforcer::{enforce, safe_fallback, EnforceContext, Rule};
use crate::evaluator::{Evaluator, Verdict};
use crate::instruction::{self, TurnBrief};
use crate::llm::{GenerationRequest, PriorTurn};
use crate::speech::render_for_voice;
use crate::state_machine::{
    after_verdict, transition, Action, EndReason, Intent, IntentDetail, Language, SessionContext,
    State,
    Transition, TransitionError,
};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Longest wait honoured from a rate-limit `retry_after`
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// What one committed turn produced
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub intent: Intent,
    pub action: Action,
    pub state: State,
    pub verdict: Option<Verdict>,
    /// Text exactly as spoken
    pub reply: String,
    /// Every violation seen across generation attempts
    pub violations: Vec<Rule>,
    pub used_fallback: bool,
}

struct Reply {
    text: String,
    violations: Vec<Rule>,
    used_fallback: bool,
}

/// Runtime for one session. The context is only replaced once a turn has
/// been persisted, so a failed or cancelled turn leaves it untouched.
pub struct SessionRuntime {
    ctx: SessionContext,
    collaborators: Collaborators,
    config: Arc<TutorConfig>,
    evaluator: Evaluator,
    history: VecDeque<PriorTurn>,
    last_reply: Option<String>,
}

impl SessionRuntime {
    pub fn new(
        ctx: SessionContext,
        collaborators: Collaborators,
        config: Arc<TutorConfig>,
    ) -> Self {
        let evaluator = Evaluator::new(config.session.decimal_tolerance);
        Self {
            ctx,
            collaborators,
            config,
            evaluator,
            history: VecDeque::new(),
            last_reply: None,
        }
    }

    /// Seed the replay window from stored turns
    pub fn with_history(mut self, turns: &[TurnRecord]) -> Self {
        for record in turns {
            self.remember(&record.turn.student_text, &record.turn.tutor_text);
        }
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn remember(&mut self, student: &str, tutor: &str) {
        if !student.trim().is_empty() {
            self.history.push_back(PriorTurn::student(student));
        }
        self.history.push_back(PriorTurn::tutor(tutor));
        while self.history.len() > HISTORY_TURNS * 2 {
            self.history.pop_front();
        }
        self.last_reply = Some(tutor.to_string());
    }

    /// Opening line of a session. The state stays in greeting.
    pub async fn greet(&mut self, cancel: &CancellationToken) -> Result<String, TurnError> {
        let ctx = self.ctx.clone();
        let reply = self.compose(Action::Greet, &ctx, None, "", cancel).await?;
        let spoken = render_for_voice(&reply.text, ctx.language);
        self.remember("", &spoken);
        self.speak(&spoken, ctx.language, cancel).await;
        Ok(spoken)
    }

    /// Run one student turn end to end
    #[allow(clippy::too_many_lines)] // the whole pipeline reads top to bottom
    pub async fn run_turn(
        &mut self,
        transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }

        let mut ctx = self.ctx.clone();
        ctx.touch(Utc::now());
        let state_before = ctx.state;
        let limits = self.config.session;

        let intent = self.classify(transcript, &ctx, cancel).await?;
        let mut step = transition(ctx.state, &intent, &ctx, &limits);

        let mut verdict = None;
        if step.is_pending() {
            let result = {
                let question = ctx
                    .question
                    .as_ref()
                    .ok_or(TransitionError::NoActiveQuestion { state: ctx.state })?;
                self.evaluator
                    .evaluate(&transcript.text, &question.answer, &question.alternates)
            };
            tracing::debug!(
                session_id = %ctx.session_id,
                verdict = result.label(),
                "Answer evaluated"
            );
            if !result.is_correct() {
                ctx.note_wrong_attempt(&transcript.text);
            }
            step = after_verdict(&result, &ctx, &limits)?;
            verdict = Some(result);
        }

        ctx.apply(&step)?;
        let mut action = step.action;

        if step.loads_question() {
            let next = self
                .collaborators
                .questions
                .next_question(&ctx.topic, &ctx.asked_ids)
                .await;
            if let Some(question) = next {
                ctx.install_question(question);
            } else {
                tracing::info!(
                    session_id = %ctx.session_id,
                    topic = %ctx.topic,
                    "Question source exhausted"
                );
                let end = Transition::end(EndReason::ContentExhausted);
                ctx.apply(&end)?;
                action = end.action;
            }
        }

        let reply = self
            .compose(action, &ctx, verdict.as_ref(), &transcript.text, cancel)
            .await?;
        let spoken = render_for_voice(&reply.text, ctx.language);

        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }
        let turn = NewTurn {
            student_text: transcript.text.clone(),
            intent: intent.clone(),
            state_before,
            state_after: ctx.state,
            action,
            verdict: verdict.clone(),
            tutor_text: spoken.clone(),
            violations: reply.violations.clone(),
            used_fallback: reply.used_fallback,
        };
        if let Err(e) = self.collaborators.store.save_turn(&ctx, &turn).await {
            tracing::error!(session_id = %ctx.session_id, error = %e, "Failed to persist turn");
            return Err(TurnError::Storage(e));
        }

        self.ctx = ctx;
        self.remember(&transcript.text, &spoken);
        tracing::info!(
            session_id = %self.ctx.session_id,
            from = %state_before,
            state = %self.ctx.state,
            intent = intent.category.as_str(),
            action = ?action,
            used_fallback = reply.used_fallback,
            "Turn committed"
        );

        self.speak(&spoken, self.ctx.language, cancel).await;

        Ok(TurnOutcome {
            intent,
            action,
            state: self.ctx.state,
            verdict,
            reply: spoken,
            violations: reply.violations,
            used_fallback: reply.used_fallback,
        })
    }

    /// Patterns first; the model only sees what they cannot place. A failing
    /// model degrades to unintelligible, and without one the word-count
    /// heuristic decides.
    async fn classify(
        &self,
        transcript: &Transcript,
        ctx: &SessionContext,
        cancel: &CancellationToken,
    ) -> Result<Intent, TurnError> {
        let garbled = transcript.is_garbled(self.config.stt_confidence_threshold);
        if let FastPath::Decided(intent) =
            classify_fast(&transcript.text, garbled, ctx.state, Some(&ctx.topic))
        {
            return Ok(intent);
        }

        let Some(model) = &self.collaborators.intent_model else {
            return Ok(heuristic_fallback(&transcript.text));
        };

        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(TurnError::Cancelled),
            r = tokio::time::timeout(
                self.config.classifier_timeout,
                model.classify(&transcript.text, ctx.state),
            ) => r,
        };
        Ok(match outcome {
            Ok(Ok(intent)) => intent,
            Ok(Err(e)) => {
                tracing::warn!(session_id = %ctx.session_id, error = %e, "Model classifier failed");
                Intent::unintelligible(IntentDetail::None)
            }
            Err(_) => {
                tracing::warn!(session_id = %ctx.session_id, "Model classifier timed out");
                Intent::unintelligible(IntentDetail::None)
            }
        })
    }

    /// Produce an enforced reply: a template, a generated line, or the safe
    /// fallback
    #[allow(clippy::too_many_lines)] // retry loop with per-outcome logging
    async fn compose(
        &self,
        action: Action,
        ctx: &SessionContext,
        verdict: Option<&Verdict>,
        utterance: &str,
        cancel: &CancellationToken,
    ) -> Result<Reply, TurnError> {
        if let Some(text) = instruction::templated_reply(action, ctx) {
            return Ok(Reply {
                text,
                violations: Vec::new(),
                used_fallback: false,
            });
        }

        let previous = self.last_reply.as_deref();
        let built = instruction::build(&TurnBrief {
            action,
            state: ctx.state,
            ctx,
            verdict,
            student_utterance: utterance,
            previous,
        });
        let enforce_ctx = EnforceContext::new(ctx.state, ctx.language)
            .with_verdict(verdict)
            .with_student_utterance(utterance)
            .with_previous(previous)
            .with_limits(self.config.enforcer);
        let prior: Vec<PriorTurn> = self.history.iter().cloned().collect();

        let mut corrections: Vec<Rule> = Vec::new();
        let mut seen: Vec<Rule> = Vec::new();
        let mut repaired: Option<String> = None;

        for attempt in 1..=self.config.max_generation_attempts.max(1) {
            let request = GenerationRequest::new(
                built.system.clone(),
                instruction::with_corrections(&built.directive, &corrections),
            )
            .with_prior_turns(prior.clone());

            let generated = tokio::select! {
                () = cancel.cancelled() => return Err(TurnError::Cancelled),
                r = tokio::time::timeout(
                    self.config.generation_timeout,
                    self.collaborators.generator.generate(&request),
                ) => r,
            };

            let generation = match generated {
                Ok(Ok(generation)) => generation,
                Ok(Err(e)) => {
                    tracing::warn!(
                        session_id = %ctx.session_id,
                        attempt,
                        error = %e,
                        retryable = e.kind.is_retryable(),
                        "Generation failed"
                    );
                    if !e.kind.is_retryable() {
                        break;
                    }
                    if let Some(wait) = e.retry_after {
                        tokio::select! {
                            () = cancel.cancelled() => return Err(TurnError::Cancelled),
                            () = tokio::time::sleep(wait.min(MAX_BACKOFF)) => {}
                        }
                    }
                    continue;
                }
                Err(_) => {
                    tracing::warn!(
                        session_id = %ctx.session_id,
                        attempt,
                        timeout_ms = %self.config.generation_timeout.as_millis(),
                        "Generation timed out"
                    );
                    continue;
                }
            };

            let result = enforce(&generation.text, &enforce_ctx);
            if result.passed {
                return Ok(Reply {
                    text: result.text,
                    violations: seen,
                    used_fallback: false,
                });
            }
            seen.extend(result.violations.iter().copied());
            if result.is_deliverable() {
                repaired = Some(result.text);
            }
            corrections = result.violations;
        }

        if let Some(text) = repaired {
            return Ok(Reply {
                text,
                violations: seen,
                used_fallback: false,
            });
        }

        tracing::warn!(
            session_id = %ctx.session_id,
            state = %ctx.state,
            violations = ?seen,
            "Using safe fallback"
        );
        Ok(Reply {
            text: safe_fallback(ctx.state, ctx.language).to_string(),
            violations: seen,
            used_fallback: true,
        })
    }

    async fn speak(&self, text: &str, language: Language, cancel: &CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(session_id = %self.ctx.session_id, "Speech cancelled");
            }
            result = self.collaborators.speaker.speak(text, language) => {
                if let Err(e) = result {
                    tracing::warn!(
                        session_id = %self.ctx.session_id,
                        error = %e,
                        "Speech output failed"
                    );
                }
            }
        }
    }
}
