use crate::model::{Action, SessionStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("invalid transition: cannot {action} a session that is {from}")]
    InvalidTransition { from: SessionStatus, action: Action },

    #[error("candidate {candidate_id} already has an active interview")]
    DuplicateActiveSession { candidate_id: String },

    #[error("session {session_id} is {status} and cannot be evaluated")]
    SessionNotReady {
        session_id: String,
        status: SessionStatus,
    },

    #[error("no responses recorded for session {session_id}")]
    NoResponses { session_id: String },

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("scoring failed: {0}")]
    ScoringFailed(String),

    #[error("conflict: session {session_id} is no longer {expected}")]
    Conflict {
        session_id: String,
        expected: SessionStatus,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("user {candidate_id} is not a candidate")]
    InvalidCandidate { candidate_id: String },

    #[error("session {session_id} is not assigned to candidate {candidate_id}")]
    NotAssigned {
        session_id: String,
        candidate_id: String,
    },

    #[error("session {session_id} can only be joined by its assigned candidate")]
    JoinRequiresCandidate { session_id: String },

    #[error("session {session_id} is already being evaluated")]
    EvaluationInProgress { session_id: String },

    #[error("question {question_id} already answered in session {session_id}")]
    DuplicateResponse {
        session_id: String,
        question_id: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InterviewError {
    /// Failures that leave a Response untouched and eligible for a later run.
    pub fn is_retry_eligible(&self) -> bool {
        matches!(
            self,
            InterviewError::TranscriptionFailed(_)
                | InterviewError::ScoringFailed(_)
                | InterviewError::Timeout { .. }
                | InterviewError::Storage(_)
        )
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        InterviewError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InterviewError>;
