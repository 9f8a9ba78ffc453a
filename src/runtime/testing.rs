//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::Collaborators;
use crate::config::TutorConfig;
use crate::content::QuestionBank;
use crate::db::{NewTurn, TurnRecord};
use crate::llm::{Generation, GenerationError, GenerationRequest, Generator};
use crate::state_machine::{Intent, Language, Question, SessionContext, State};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Generator
// ============================================================================

/// Mock generator that returns queued results
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<Generation, GenerationError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: "mock-generator".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_text(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Generation::new(text)));
    }

    /// Queue an error
    pub fn queue_error(&self, error: GenerationError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self) -> Result<Generation, GenerationError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::network("No mock response queued")))
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Mock generator with a fixed delay (for timeout and cancellation tests)
pub struct DelayedMockGenerator {
    inner: MockGenerator,
    delay: Duration,
    /// Notified when a request starts
    pub request_started: Arc<Notify>,
}

impl DelayedMockGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockGenerator::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_text(&self, text: &str) {
        self.inner.queue_text(text);
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for DelayedMockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Mock Intent Model
// ============================================================================

/// Model classifier returning queued results
pub struct MockIntentModel {
    responses: Mutex<VecDeque<Result<Intent, String>>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockIntentModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, result: Result<Intent, String>) {
        self.responses.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl IntentModel for MockIntentModel {
    async fn classify(&self, utterance: &str, _state: State) -> Result<Intent, String> {
        self.calls.lock().unwrap().push(utterance.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("No mock intent queued".to_string()))
    }
}

// ============================================================================
// Recording Speaker
// ============================================================================

/// Speaker that records everything it is asked to say
pub struct RecordingSpeaker {
    pub spoken: Mutex<Vec<(String, Language)>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str, language: Language) -> Result<(), String> {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), language));
        Ok(())
    }
}

// ============================================================================
// In-Memory Storage
// ============================================================================

/// In-memory session store
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, SessionContext>>,
    turns: Mutex<Vec<TurnRecord>>,
    fail_saves: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            turns: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every following `save_turn` fail
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionContext> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }

    pub fn turns_for(&self, session_id: &str) -> Vec<NewTurn> {
        self.turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.session_id == session_id)
            .map(|t| t.turn.clone())
            .collect()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, ctx: &SessionContext) -> Result<(), String> {
        self.sessions
            .lock()
            .unwrap()
            .insert(ctx.session_id.clone(), ctx.clone());
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionContext>, String> {
        Ok(self.snapshot(session_id))
    }

    async fn save_turn(&self, ctx: &SessionContext, turn: &NewTurn) -> Result<(), String> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        let mut sessions = self.sessions.lock().unwrap();
        let Some(stored) = sessions.get_mut(&ctx.session_id) else {
            return Err(format!("Session not found: {}", ctx.session_id));
        };
        *stored = ctx.clone();

        let mut turns = self.turns.lock().unwrap();
        #[allow(clippy::cast_possible_wrap)]
        let sequence_id = turns
            .iter()
            .filter(|t| t.session_id == ctx.session_id)
            .count() as i64
            + 1;
        turns.push(TurnRecord {
            turn_id: uuid::Uuid::new_v4().to_string(),
            session_id: ctx.session_id.clone(),
            sequence_id,
            turn: turn.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, String> {
        let turns: Vec<TurnRecord> = self
            .turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        let skip = turns.len().saturating_sub(limit);
        Ok(turns.into_iter().skip(skip).collect())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Seed question by id
pub fn seed_question(id: &str) -> Question {
    let bank = QuestionBank::seed().unwrap();
    let mut asked = Vec::new();
    while let Some(q) = bank.next_question("rational numbers", &asked) {
        if q.id == id {
            return q;
        }
        asked.push(q.id);
    }
    panic!("no seed question {id}");
}

/// Config with short timeouts
pub fn test_config() -> Arc<TutorConfig> {
    Arc::new(TutorConfig {
        generation_timeout: Duration::from_millis(200),
        classifier_timeout: Duration::from_millis(100),
        ..TutorConfig::default()
    })
}

/// Shared mocks plus the collaborator bundle built from them
pub struct TestHarness {
    pub generator: Arc<MockGenerator>,
    pub store: Arc<InMemoryStore>,
    pub speaker: Arc<RecordingSpeaker>,
    pub bank: Arc<QuestionBank>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_bank(QuestionBank::seed().unwrap())
    }

    pub fn with_bank(bank: QuestionBank) -> Self {
        Self {
            generator: Arc::new(MockGenerator::new()),
            store: Arc::new(InMemoryStore::new()),
            speaker: Arc::new(RecordingSpeaker::new()),
            bank: Arc::new(bank),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        self.collaborators_with(self.generator.clone(), None)
    }

    pub fn collaborators_with(
        &self,
        generator: Arc<dyn Generator>,
        intent_model: Option<Arc<dyn IntentModel>>,
    ) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            generator,
            questions: self.bank.clone(),
            intent_model,
            speaker: self.speaker.clone(),
        }
    }

    /// A stored session sitting in `state` with `question` active
    pub async fn context_in(&self, state: State, question: Option<Question>) -> SessionContext {
        let mut ctx = SessionContext::new("s1", "rational numbers", Utc::now());
        if let Some(question) = question {
            ctx.install_question(question);
        }
        ctx.state = state;
        self.store.create_session(&ctx).await.unwrap();
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Transcript;
    use crate::enforcer::{safe_fallback, Rule};
    use crate::evaluator::Verdict;
    use crate::runtime::{SessionManager, SessionRuntime, TurnError};
    use crate::state_machine::{Action, EndReason, IntentCategory};
    use tokio_util::sync::CancellationToken;

    fn runtime(harness: &TestHarness, ctx: SessionContext) -> SessionRuntime {
        SessionRuntime::new(ctx, harness.collaborators(), test_config())
    }

    #[tokio::test]
    async fn test_spoken_fraction_answer_advances() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::AwaitingAnswer, Some(seed_question("rn_subtract_to_negative")))
            .await;
        let reply = "Bilkul sahi, aapne minus 1 by 7 bola! Ab batao, minus 3 by 9 plus minus 2 by 9 kitna hota hai?";
        harness.generator.queue_text(reply);

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(&Transcript::text("minus 1 by 7"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.intent.category, IntentCategory::AnswerAttempt);
        assert!(matches!(outcome.verdict, Some(Verdict::Correct { .. })));
        assert_eq!(outcome.action, Action::AdvanceQuestion);
        assert_eq!(outcome.state, State::AwaitingAnswer);
        assert_eq!(outcome.reply, reply);
        assert!(outcome.violations.is_empty());
        assert!(!outcome.used_fallback);

        let ctx = rt.context();
        assert_eq!(ctx.score, 1);
        assert_eq!(ctx.attempts, 1);
        assert_eq!(ctx.questions_asked, 2);
        assert_eq!(ctx.question.as_ref().unwrap().id, "rn_add_same_denominator");

        let requests = harness.generator.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system.contains("answered correctly"));
        assert!(requests[0]
            .directive
            .contains("Minus 3 by 9 plus minus 2 by 9 kitna hota hai?"));

        let turns = harness.store.turns_for("s1");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].state_before, State::AwaitingAnswer);
        assert_eq!(turns[0].tutor_text, reply);
        assert_eq!(harness.store.snapshot("s1").unwrap().score, 1);
        assert_eq!(harness.speaker.lines(), vec![reply.to_string()]);
    }

    #[tokio::test]
    async fn test_generation_failures_end_in_fallback() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::AwaitingAnswer, Some(seed_question("rn_subtract_to_negative")))
            .await;
        for _ in 0..3 {
            harness
                .generator
                .queue_error(GenerationError::server_error("overloaded"));
        }

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(&Transcript::text("3"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.action, Action::GiveHint { level: 1 });
        assert!(outcome.used_fallback);
        assert_eq!(outcome.reply, safe_fallback(State::Hinting, Language::Hinglish));
        assert_eq!(harness.generator.recorded_requests().len(), 3);
        assert_eq!(rt.context().wrong_attempts, vec!["3".to_string()]);
        assert_eq!(rt.context().hint_level, 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error_skips_remaining_attempts() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::Teaching, Some(seed_question("rn_subtract_to_negative")))
            .await;
        harness
            .generator
            .queue_error(GenerationError::auth("bad key"));

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(&Transcript::text("okay"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(harness.generator.recorded_requests().len(), 1);
        assert_eq!(outcome.state, State::AwaitingAnswer);
    }

    #[tokio::test]
    async fn test_retry_carries_corrections() {
        let harness = TestHarness::new();
        let mut ctx = harness
            .context_in(State::Teaching, Some(seed_question("rn_subtract_to_negative")))
            .await;
        ctx.language = Language::English;
        harness.generator.queue_text("यह सवाल सुनिए।");
        harness
            .generator
            .queue_text("Here is your question. What is 2 by 7 minus 3 by 7?");

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(&Transcript::text("okay"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.action, Action::AskQuestion { forced: false });
        assert_eq!(outcome.violations, vec![Rule::WrongLanguage]);
        assert_eq!(
            outcome.reply,
            "Here is your question. What is 2 by 7 minus 3 by 7?"
        );
        let requests = harness.generator.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].directive.contains("WRONG_LANGUAGE"));
        assert!(requests[1].directive.contains("WRONG_LANGUAGE"));
    }

    #[tokio::test]
    async fn test_repaired_text_is_used_when_attempts_run_out() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::Teaching, Some(seed_question("rn_subtract_to_negative")))
            .await;
        for _ in 0..3 {
            harness
                .generator
                .queue_text("Shabash! 2 by 7 minus 3 by 7 kitna hota hai?");
        }

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(&Transcript::text("okay"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.used_fallback);
        assert_eq!(outcome.reply, "2 by 7 minus 3 by 7 kitna hota hai?");
        assert_eq!(outcome.violations, vec![Rule::FalsePraise; 3]);
    }

    #[tokio::test]
    async fn test_generation_timeout_falls_back() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::Teaching, Some(seed_question("rn_subtract_to_negative")))
            .await;
        let slow = Arc::new(DelayedMockGenerator::new(Duration::from_secs(2)));
        slow.queue_text("Too late.");
        let config = Arc::new(TutorConfig {
            generation_timeout: Duration::from_millis(30),
            max_generation_attempts: 2,
            ..TutorConfig::default()
        });

        let mut rt =
            SessionRuntime::new(ctx, harness.collaborators_with(slow.clone(), None), config);
        let outcome = rt
            .run_turn(&Transcript::text("okay"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(slow.request_count(), 2);
        assert_eq!(outcome.reply, safe_fallback(State::AwaitingAnswer, Language::Hinglish));
    }

    #[tokio::test]
    async fn test_cancellation_leaves_context_untouched() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::AwaitingAnswer, Some(seed_question("rn_subtract_to_negative")))
            .await;
        let slow = Arc::new(DelayedMockGenerator::new(Duration::from_secs(5)));
        slow.queue_text("Never delivered.");
        let before = ctx.clone();

        let mut rt =
            SessionRuntime::new(ctx, harness.collaborators_with(slow.clone(), None), test_config());
        let cancel = CancellationToken::new();
        let transcript = Transcript::text("minus 1 by 7");
        let (result, ()) = tokio::join!(
            rt.run_turn(&transcript, &cancel),
            async {
                slow.request_started.notified().await;
                cancel.cancel();
            }
        );

        assert!(matches!(result, Err(TurnError::Cancelled)));
        assert_eq!(rt.context(), &before);
        assert!(harness.store.turns_for("s1").is_empty());
        assert!(harness.speaker.lines().is_empty());
    }

    #[tokio::test]
    async fn test_unclear_input_uses_escalating_templates() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::Teaching, Some(seed_question("rn_subtract_to_negative")))
            .await;
        harness
            .generator
            .queue_text("2 by 7 minus 3 by 7 kitna hota hai?");

        let mut rt = runtime(&harness, ctx);
        let cancel = CancellationToken::new();
        let first = rt.run_turn(&Transcript::text(""), &cancel).await.unwrap();
        let second = rt
            .run_turn(&Transcript::text("[silence]"), &cancel)
            .await
            .unwrap();

        assert_eq!(first.action, Action::AskRepeat { attempt: 1 });
        assert_eq!(second.action, Action::AskRepeat { attempt: 2 });
        assert_ne!(first.reply, second.reply);
        assert_eq!(rt.context().unclear_count, 2);
        assert!(harness.generator.recorded_requests().is_empty());

        rt.run_turn(&Transcript::text("okay"), &cancel).await.unwrap();
        assert_eq!(rt.context().unclear_count, 0);
    }

    #[tokio::test]
    async fn test_low_confidence_transcript_is_treated_as_garbled() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::AwaitingAnswer, Some(seed_question("rn_subtract_to_negative")))
            .await;

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(
                &Transcript::text("minus 1 by 7").with_confidence(0.1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.intent.category, IntentCategory::Unintelligible);
        assert_eq!(outcome.verdict, None);
        assert_eq!(rt.context().score, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported_and_not_committed() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::AwaitingAnswer, Some(seed_question("rn_subtract_to_negative")))
            .await;
        harness.generator.queue_text("Bilkul sahi! Agla sawaal suniye.");
        harness.store.fail_saves(true);

        let mut rt = runtime(&harness, ctx);
        let result = rt
            .run_turn(&Transcript::text("minus 1 by 7"), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(TurnError::Storage(_))));
        assert_eq!(rt.context().score, 0);
        assert_eq!(rt.context().state, State::AwaitingAnswer);
        assert!(harness.speaker.lines().is_empty());
    }

    #[tokio::test]
    async fn test_model_classifier_and_its_failure() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::Teaching, Some(seed_question("rn_subtract_to_negative")))
            .await;
        let model = Arc::new(MockIntentModel::new());
        model.queue(Ok(Intent::new(IntentCategory::Acknowledge, 0.8)));
        model.queue(Err("model offline".to_string()));
        harness
            .generator
            .queue_text("2 by 7 minus 3 by 7 kitna hota hai?");

        let collaborators =
            harness.collaborators_with(harness.generator.clone(), Some(model.clone()));
        let cancel = CancellationToken::new();
        let ambiguous = "mera dost kal cricket khelne gaya tha park mein";

        let mut rt = SessionRuntime::new(ctx.clone(), collaborators.clone(), test_config());
        let first = rt.run_turn(&Transcript::text(ambiguous), &cancel).await.unwrap();
        assert_eq!(first.intent.category, IntentCategory::Acknowledge);
        assert_eq!(first.state, State::AwaitingAnswer);

        let mut rt = SessionRuntime::new(ctx, collaborators, test_config());
        let second = rt.run_turn(&Transcript::text(ambiguous), &cancel).await.unwrap();
        assert_eq!(second.intent.category, IntentCategory::Unintelligible);
        assert!(second.intent.confidence.abs() < f32::EPSILON);
        assert_eq!(second.action, Action::AskRepeat { attempt: 1 });
        assert_eq!(second.state, State::Teaching);
        assert_eq!(model.call_count(), 2);
        assert_eq!(harness.generator.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_heuristic_without_model() {
        let harness = TestHarness::new();
        let ctx = harness
            .context_in(State::Teaching, Some(seed_question("rn_subtract_to_negative")))
            .await;
        harness
            .generator
            .queue_text("Socho ek roti ke saat tukde hain.");

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(
                &Transcript::text("mera dost kal cricket khelne gaya tha park mein"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.intent.category, IntentCategory::ConceptRequest);
        assert_eq!(outcome.action, Action::Reteach { material_index: 1 });
        assert_eq!(rt.context().reteach_count, 1);
    }

    #[tokio::test]
    async fn test_empty_question_source_ends_session() {
        let only = seed_question("rn_subtract_to_negative");
        let harness = TestHarness::with_bank(QuestionBank::new(vec![only.clone()]).unwrap());
        let ctx = harness.context_in(State::AwaitingAnswer, Some(only)).await;

        let mut rt = runtime(&harness, ctx);
        let outcome = rt
            .run_turn(&Transcript::text("minus 1 by 7"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome.action,
            Action::EndSession {
                reason: EndReason::ContentExhausted
            }
        );
        assert_eq!(outcome.state, State::SessionEnd);
        assert!(outcome.reply.starts_with("Is topic ke saare sawaal ho gaye."));
        assert_eq!(rt.context().score, 1);
        assert!(harness.generator.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_manager_rejects_concurrent_turns() {
        let harness = TestHarness::new();
        let slow = Arc::new(DelayedMockGenerator::new(Duration::from_millis(300)));
        slow.queue_text("Namaste! Aaj hum rational numbers padhenge.");
        slow.queue_text("Jab neeche wala number same ho, toh upar ke numbers jodte hain.");
        let manager = Arc::new(SessionManager::new(
            harness.collaborators_with(slow.clone(), None),
            Arc::new(TutorConfig::default()),
        ));
        let cancel = CancellationToken::new();

        let (session_id, greeting) = manager
            .start_session("rational numbers", &cancel)
            .await
            .unwrap();
        assert_eq!(greeting, "Namaste! Aaj hum rational numbers padhenge.");
        assert_eq!(manager.active_sessions().await, 1);

        let first = {
            let manager = Arc::clone(&manager);
            let session_id = session_id.clone();
            tokio::spawn(async move {
                manager
                    .run_turn(&session_id, &Transcript::text("haan"), &CancellationToken::new())
                    .await
            })
        };
        while slow.request_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let second = manager
            .run_turn(&session_id, &Transcript::text("haan"), &cancel)
            .await;
        assert!(matches!(second, Err(TurnError::SessionBusy(_))));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.action, Action::StartTeaching);
        assert_eq!(first.state, State::Teaching);
        assert_eq!(harness.store.turns_for(&session_id).len(), 1);
    }

    #[tokio::test]
    async fn test_manager_resume_rules() {
        let harness = TestHarness::new();
        let manager = SessionManager::new(harness.collaborators(), test_config());

        harness
            .context_in(State::Hinting, Some(seed_question("rn_subtract_to_negative")))
            .await;
        manager.resume_session("s1").await.unwrap();
        assert_eq!(manager.active_sessions().await, 1);

        let mut ended = SessionContext::new("done", "rational numbers", Utc::now());
        ended.state = State::SessionEnd;
        harness.store.create_session(&ended).await.unwrap();
        assert!(matches!(
            manager.resume_session("done").await,
            Err(TurnError::SessionEnded(_))
        ));
        assert!(matches!(
            manager.resume_session("missing").await,
            Err(TurnError::SessionNotFound(_))
        ));
        assert!(matches!(
            manager
                .run_turn("missing", &Transcript::text("haan"), &CancellationToken::new())
                .await,
            Err(TurnError::SessionNotFound(_))
        ));
        assert!(manager.close_session("s1").await);
    }
}
