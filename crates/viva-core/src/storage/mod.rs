use crate::errors::Result;
use crate::model::{
    Candidate, EvaluationState, InterviewSession, Question, Response, Role, SessionStatus,
};
use chrono::{DateTime, Utc};

pub mod schema;
pub mod store;

pub use store::Store;

/// Record store consumed by the lifecycle manager and the evaluation pipeline.
///
/// Every method is a single atomic unit against the backing database.
/// `create_session` performs the single-active-session check and the insert
/// together; `update_session_status` only writes when the stored status still
/// equals `expected` and otherwise fails with `Conflict`.
pub trait EntityStore: Send + Sync {
    fn create_candidate(&self, username: &str, role: Role) -> Result<Candidate>;
    fn find_candidate(&self, id: &str) -> Result<Option<Candidate>>;
    fn list_candidates(&self) -> Result<Vec<Candidate>>;

    fn create_question(&self, text: &str, tech_stack: &str, created_by: &str) -> Result<Question>;
    fn find_question(&self, id: &str) -> Result<Option<Question>>;
    fn list_tech_stacks(&self) -> Result<Vec<String>>;
    fn questions_for_stack(&self, tech_stack: &str) -> Result<Vec<Question>>;

    fn create_session(
        &self,
        candidate_id: &str,
        tech_stack: &str,
        started_at: DateTime<Utc>,
    ) -> Result<InterviewSession>;
    fn find_session(&self, id: &str) -> Result<Option<InterviewSession>>;
    fn find_active_session(&self, candidate_id: &str) -> Result<Option<InterviewSession>>;
    fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<InterviewSession>>;
    fn update_session_status(
        &self,
        id: &str,
        expected: SessionStatus,
        next: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    fn create_response(
        &self,
        session_id: &str,
        question_id: &str,
        audio_path: &str,
    ) -> Result<Response>;
    /// Responses of a session in submission order.
    fn find_responses(&self, session_id: &str) -> Result<Vec<Response>>;
    fn update_response_evaluation(&self, id: &str, evaluation: &EvaluationState) -> Result<()>;
}
