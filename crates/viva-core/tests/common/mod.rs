#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use viva_core::engine::{EvaluationPipeline, PipelinePolicy};
use viva_core::lifecycle::LifecycleManager;
use viva_core::model::{
    Action, Actor, Candidate, EvaluationState, InterviewSession, Question, Response, Role,
    SessionStatus,
};
use viva_core::providers::llm::{FakeClient, LlmClient};
use viva_core::providers::transcription::{FakeTranscriber, Transcriber};
use viva_core::scoring::Scorer;
use viva_core::storage::{EntityStore, Store};
use viva_core::{InterviewError, Result};

pub const GOOD_REPLY: &str = "Score: 8\nJustification: Clear and correct.";

pub fn memory_store() -> Store {
    let s = Store::memory().expect("memory store");
    s.init_schema().expect("schema");
    s
}

pub struct Fixture {
    pub store: Arc<dyn EntityStore>,
    pub lifecycle: LifecycleManager,
    pub candidate: Candidate,
    pub questions: Vec<Question>,
    pub session: InterviewSession,
    pub responses: Vec<Response>,
}

/// Candidate with a session in `completed` holding one answer per question.
pub fn completed_session(store: Arc<dyn EntityStore>, answers: usize) -> Fixture {
    let lifecycle = LifecycleManager::new(store.clone());
    let candidate = store
        .create_candidate("candidate-a", Role::Candidate)
        .expect("candidate");
    let questions: Vec<Question> = (1..=answers)
        .map(|i| {
            store
                .create_question(&format!("Question {}?", i), "Rust", "admin")
                .expect("question")
        })
        .collect();

    let session = lifecycle.start_session(&candidate.id, "Rust").expect("start");
    lifecycle.join(&session.id, &candidate.id).expect("join");
    let responses = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            lifecycle
                .submit_response(&session.id, &candidate.id, &q.id, &audio_ref(i + 1))
                .expect("submit")
        })
        .collect();
    let session = lifecycle
        .transition_session(&session.id, &Actor::Operator, Action::Complete)
        .expect("complete");

    Fixture {
        store,
        lifecycle,
        candidate,
        questions,
        session,
        responses,
    }
}

pub fn audio_ref(n: usize) -> String {
    format!("/uploads/audio/answer_{}.webm", n)
}

/// Transcript produced by `FakeTranscriber` for an unscripted reference.
pub fn default_transcript(n: usize) -> String {
    format!("answer for {}", audio_ref(n))
}

pub fn pipeline(
    lifecycle: &LifecycleManager,
    transcriber: Arc<dyn Transcriber>,
    client: Arc<dyn LlmClient>,
    policy: PipelinePolicy,
) -> EvaluationPipeline {
    EvaluationPipeline::new(lifecycle.clone(), transcriber, Scorer::new(client), policy)
}

pub fn fakes() -> (Arc<FakeTranscriber>, Arc<FakeClient>) {
    (
        Arc::new(FakeTranscriber::new()),
        Arc::new(FakeClient::new(GOOD_REPLY)),
    )
}

pub fn assert_no_partial_state(responses: &[Response]) {
    for r in responses {
        let e = &r.evaluation;
        assert_eq!(
            e.score().is_some(),
            e.justification().is_some(),
            "score and justification must travel together ({})",
            r.id
        );
        if e.score().is_some() {
            assert!(e.transcription().is_some());
        }
    }
}

/// Delegating store that counts write calls.
pub struct CountingStore {
    pub inner: Store,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Store) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Delegating store whose `completed -> evaluated` update loses the
/// optimistic race `conflicts` times before succeeding.
pub struct ConflictingStore {
    pub inner: Store,
    pub conflicts: AtomicUsize,
}

impl ConflictingStore {
    pub fn new(inner: Store, conflicts: usize) -> Self {
        Self {
            inner,
            conflicts: AtomicUsize::new(conflicts),
        }
    }
}

macro_rules! delegate_reads {
    () => {
        fn find_candidate(&self, id: &str) -> Result<Option<Candidate>> {
            self.inner.find_candidate(id)
        }
        fn list_candidates(&self) -> Result<Vec<Candidate>> {
            self.inner.list_candidates()
        }
        fn find_question(&self, id: &str) -> Result<Option<Question>> {
            self.inner.find_question(id)
        }
        fn list_tech_stacks(&self) -> Result<Vec<String>> {
            self.inner.list_tech_stacks()
        }
        fn questions_for_stack(&self, tech_stack: &str) -> Result<Vec<Question>> {
            self.inner.questions_for_stack(tech_stack)
        }
        fn find_session(&self, id: &str) -> Result<Option<InterviewSession>> {
            self.inner.find_session(id)
        }
        fn find_active_session(&self, candidate_id: &str) -> Result<Option<InterviewSession>> {
            self.inner.find_active_session(candidate_id)
        }
        fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<InterviewSession>> {
            self.inner.list_sessions(status)
        }
        fn find_responses(&self, session_id: &str) -> Result<Vec<Response>> {
            self.inner.find_responses(session_id)
        }
    };
}

impl EntityStore for CountingStore {
    delegate_reads!();

    fn create_candidate(&self, username: &str, role: Role) -> Result<Candidate> {
        self.write();
        self.inner.create_candidate(username, role)
    }
    fn create_question(&self, text: &str, tech_stack: &str, created_by: &str) -> Result<Question> {
        self.write();
        self.inner.create_question(text, tech_stack, created_by)
    }
    fn create_session(
        &self,
        candidate_id: &str,
        tech_stack: &str,
        started_at: DateTime<Utc>,
    ) -> Result<InterviewSession> {
        self.write();
        self.inner.create_session(candidate_id, tech_stack, started_at)
    }
    fn update_session_status(
        &self,
        id: &str,
        expected: SessionStatus,
        next: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.write();
        self.inner.update_session_status(id, expected, next, ended_at)
    }
    fn create_response(&self, session_id: &str, question_id: &str, audio_path: &str) -> Result<Response> {
        self.write();
        self.inner.create_response(session_id, question_id, audio_path)
    }
    fn update_response_evaluation(&self, id: &str, evaluation: &EvaluationState) -> Result<()> {
        self.write();
        self.inner.update_response_evaluation(id, evaluation)
    }
}

impl EntityStore for ConflictingStore {
    delegate_reads!();

    fn create_candidate(&self, username: &str, role: Role) -> Result<Candidate> {
        self.inner.create_candidate(username, role)
    }
    fn create_question(&self, text: &str, tech_stack: &str, created_by: &str) -> Result<Question> {
        self.inner.create_question(text, tech_stack, created_by)
    }
    fn create_session(
        &self,
        candidate_id: &str,
        tech_stack: &str,
        started_at: DateTime<Utc>,
    ) -> Result<InterviewSession> {
        self.inner.create_session(candidate_id, tech_stack, started_at)
    }
    fn update_session_status(
        &self,
        id: &str,
        expected: SessionStatus,
        next: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if next == SessionStatus::Evaluated {
            let left = self.conflicts.load(Ordering::SeqCst);
            if left > 0 {
                self.conflicts.store(left - 1, Ordering::SeqCst);
                return Err(InterviewError::Conflict {
                    session_id: id.to_string(),
                    expected,
                });
            }
        }
        self.inner.update_session_status(id, expected, next, ended_at)
    }
    fn create_response(&self, session_id: &str, question_id: &str, audio_path: &str) -> Result<Response> {
        self.inner.create_response(session_id, question_id, audio_path)
    }
    fn update_response_evaluation(&self, id: &str, evaluation: &EvaluationState) -> Result<()> {
        self.inner.update_response_evaluation(id, evaluation)
    }
}
