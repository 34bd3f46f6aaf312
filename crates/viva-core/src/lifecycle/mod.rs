//! Interview session state machine.
//!
//! `pending -> in-progress -> completed -> evaluated`. The first two steps are
//! caller actions ([`Action`]); the last one belongs to the evaluation pipeline
//! and is reachable only through [`LifecycleManager::mark_evaluated`].

use crate::errors::{InterviewError, Result};
use crate::model::{
    Action, Actor, InterviewSession, Question, Response, Role, SessionStatus,
};
use crate::storage::EntityStore;
use chrono::Utc;
use std::sync::Arc;

impl SessionStatus {
    /// Total transition function over (state, action).
    pub fn apply(self, action: Action) -> Result<SessionStatus> {
        match (self, action) {
            (SessionStatus::Pending, Action::Join) => Ok(SessionStatus::InProgress),
            (SessionStatus::InProgress, Action::Complete) => Ok(SessionStatus::Completed),
            (from, action) => Err(InterviewError::InvalidTransition { from, action }),
        }
    }
}

#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn EntityStore>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn start_session(&self, candidate_id: &str, tech_stack: &str) -> Result<InterviewSession> {
        let tech_stack = tech_stack.trim();
        if tech_stack.is_empty() {
            return Err(InterviewError::InvalidInput("tech stack is required".into()));
        }

        let candidate = self
            .store
            .find_candidate(candidate_id)?
            .ok_or_else(|| InterviewError::not_found("candidate", candidate_id))?;
        if candidate.role != Role::Candidate {
            return Err(InterviewError::InvalidCandidate {
                candidate_id: candidate_id.to_string(),
            });
        }

        let session = self
            .store
            .create_session(candidate_id, tech_stack, Utc::now())?;
        tracing::info!(
            event = "viva.session.started",
            session_id = %session.id,
            candidate_id = %candidate_id,
            tech_stack = %tech_stack,
        );
        Ok(session)
    }

    pub fn transition_session(
        &self,
        session_id: &str,
        actor: &Actor,
        action: Action,
    ) -> Result<InterviewSession> {
        let mut session = self.load(session_id)?;

        match (action, actor) {
            (Action::Join, Actor::Operator) => {
                return Err(InterviewError::JoinRequiresCandidate {
                    session_id: session_id.to_string(),
                })
            }
            (_, Actor::Candidate(candidate_id)) if *candidate_id != session.candidate_id => {
                return Err(InterviewError::NotAssigned {
                    session_id: session_id.to_string(),
                    candidate_id: candidate_id.clone(),
                })
            }
            _ => {}
        }

        let next = session.status.apply(action)?;
        let ended_at = (next == SessionStatus::Completed).then(Utc::now);

        self.store
            .update_session_status(session_id, session.status, next, ended_at)?;

        tracing::info!(
            event = "viva.session.transition",
            session_id = %session_id,
            from = %session.status,
            to = %next,
            action = %action,
        );

        session.status = next;
        if ended_at.is_some() {
            session.ended_at = ended_at;
        }
        Ok(session)
    }

    pub fn join(&self, session_id: &str, candidate_id: &str) -> Result<InterviewSession> {
        self.transition_session(
            session_id,
            &Actor::Candidate(candidate_id.to_string()),
            Action::Join,
        )
    }

    pub fn complete(&self, session_id: &str, actor: &Actor) -> Result<InterviewSession> {
        self.transition_session(session_id, actor, Action::Complete)
    }

    /// `completed -> evaluated`. Called by the evaluation pipeline only.
    pub(crate) fn mark_evaluated(&self, session_id: &str) -> Result<()> {
        self.store.update_session_status(
            session_id,
            SessionStatus::Completed,
            SessionStatus::Evaluated,
            None,
        )?;
        tracing::info!(
            event = "viva.session.transition",
            session_id = %session_id,
            from = %SessionStatus::Completed,
            to = %SessionStatus::Evaluated,
        );
        Ok(())
    }

    pub fn active_session_for(&self, candidate_id: &str) -> Result<Option<InterviewSession>> {
        self.store.find_active_session(candidate_id)
    }

    pub fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<InterviewSession>> {
        self.store.list_sessions(status)
    }

    pub fn questions_for_session(&self, session_id: &str) -> Result<Vec<Question>> {
        let session = self.load(session_id)?;
        self.store.questions_for_stack(&session.tech_stack)
    }

    /// Records a candidate's answer. The audio artifact is stored elsewhere;
    /// only its opaque reference is kept.
    pub fn submit_response(
        &self,
        session_id: &str,
        candidate_id: &str,
        question_id: &str,
        audio_ref: &str,
    ) -> Result<Response> {
        if audio_ref.trim().is_empty() {
            return Err(InterviewError::InvalidInput("audio reference is required".into()));
        }

        let session = self.load(session_id)?;
        if session.candidate_id != candidate_id {
            return Err(InterviewError::NotAssigned {
                session_id: session_id.to_string(),
                candidate_id: candidate_id.to_string(),
            });
        }
        if session.status != SessionStatus::InProgress {
            return Err(InterviewError::InvalidInput(format!(
                "session {} is {}; answers are accepted only while in-progress",
                session_id, session.status
            )));
        }

        let question = self
            .store
            .find_question(question_id)?
            .ok_or_else(|| InterviewError::not_found("question", question_id))?;
        if question.tech_stack != session.tech_stack {
            return Err(InterviewError::InvalidInput(format!(
                "question {} belongs to {}, session is {}",
                question_id, question.tech_stack, session.tech_stack
            )));
        }

        let response = self
            .store
            .create_response(session_id, question_id, audio_ref)?;
        tracing::debug!(
            event = "viva.response.submitted",
            session_id = %session_id,
            response_id = %response.id,
            question_id = %question_id,
        );
        Ok(response)
    }

    fn load(&self, session_id: &str) -> Result<InterviewSession> {
        self.store
            .find_session(session_id)?
            .ok_or_else(|| InterviewError::not_found("session", session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SessionStatus; 4] = [
        SessionStatus::Pending,
        SessionStatus::InProgress,
        SessionStatus::Completed,
        SessionStatus::Evaluated,
    ];

    #[test]
    fn transition_table_is_total() {
        for state in ALL {
            for action in [Action::Join, Action::Complete] {
                let got = state.apply(action);
                match (state, action) {
                    (SessionStatus::Pending, Action::Join) => {
                        assert_eq!(got.unwrap(), SessionStatus::InProgress)
                    }
                    (SessionStatus::InProgress, Action::Complete) => {
                        assert_eq!(got.unwrap(), SessionStatus::Completed)
                    }
                    _ => assert!(
                        matches!(got, Err(InterviewError::InvalidTransition { from, action: a }) if from == state && a == action),
                        "{state} + {action} should be rejected"
                    ),
                }
            }
        }
    }

    #[test]
    fn evaluated_is_terminal() {
        assert!(SessionStatus::Evaluated.apply(Action::Join).is_err());
        assert!(SessionStatus::Evaluated.apply(Action::Complete).is_err());
    }
}
