use super::EntityStore;
use crate::errors::{InterviewError, Result};
use crate::model::{
    Candidate, EvaluationState, InterviewSession, Question, Response, Role, SessionStatus,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    InterviewError::Config(format!(
                        "failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(super::schema::DDL)?;
        Ok(())
    }

    // A panic while holding the lock leaves the connection usable: any open
    // transaction was rolled back when it was dropped.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EntityStore for Store {
    fn create_candidate(&self, username: &str, role: Role) -> Result<Candidate> {
        let candidate = Candidate {
            id: new_id(),
            username: username.to_string(),
            role,
            created_at: Utc::now(),
        };
        let conn = self.lock();
        conn.execute(
            "INSERT INTO candidates(id, username, role, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                candidate.id,
                candidate.username,
                role.as_str(),
                ts(&candidate.created_at)
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                InterviewError::InvalidInput(format!("username '{}' already taken", username))
            } else {
                e.into()
            }
        })?;
        Ok(candidate)
    }

    fn find_candidate(&self, id: &str) -> Result<Option<Candidate>> {
        let conn = self.lock();
        let c = conn
            .query_row(
                "SELECT id, username, role, created_at FROM candidates WHERE id = ?1",
                params![id],
                candidate_from_row,
            )
            .optional()?;
        Ok(c)
    }

    fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, username, role, created_at FROM candidates
             WHERE role = 'candidate' ORDER BY username",
        )?;
        let rows = stmt.query_map([], candidate_from_row)?;
        collect(rows)
    }

    fn create_question(&self, text: &str, tech_stack: &str, created_by: &str) -> Result<Question> {
        let q = Question {
            id: new_id(),
            text: text.to_string(),
            tech_stack: tech_stack.to_string(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        let conn = self.lock();
        conn.execute(
            "INSERT INTO questions(id, text, tech_stack, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![q.id, q.text, q.tech_stack, q.created_by, ts(&q.created_at)],
        )?;
        Ok(q)
    }

    fn find_question(&self, id: &str) -> Result<Option<Question>> {
        let conn = self.lock();
        let q = conn
            .query_row(
                "SELECT id, text, tech_stack, created_by, created_at FROM questions WHERE id = ?1",
                params![id],
                question_from_row,
            )
            .optional()?;
        Ok(q)
    }

    fn list_tech_stacks(&self) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT DISTINCT tech_stack FROM questions ORDER BY tech_stack")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        collect(rows)
    }

    fn questions_for_stack(&self, tech_stack: &str) -> Result<Vec<Question>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, text, tech_stack, created_by, created_at FROM questions
             WHERE tech_stack = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map(params![tech_stack], question_from_row)?;
        collect(rows)
    }

    fn create_session(
        &self,
        candidate_id: &str,
        tech_stack: &str,
        started_at: DateTime<Utc>,
    ) -> Result<InterviewSession> {
        let session = InterviewSession {
            id: new_id(),
            candidate_id: candidate_id.to_string(),
            tech_stack: tech_stack.to_string(),
            status: SessionStatus::Pending,
            started_at,
            ended_at: None,
        };

        // Immediate so writers on other connections queue on busy_timeout.
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let active: i64 = tx.query_row(
            "SELECT count(*) FROM sessions
             WHERE candidate_id = ?1 AND status IN ('pending', 'in-progress')",
            params![candidate_id],
            |r| r.get(0),
        )?;
        if active > 0 {
            return Err(InterviewError::DuplicateActiveSession {
                candidate_id: candidate_id.to_string(),
            });
        }

        // The partial unique index backs the check above when several
        // connections share the same database file.
        tx.execute(
            "INSERT INTO sessions(id, candidate_id, tech_stack, status, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![
                session.id,
                session.candidate_id,
                session.tech_stack,
                session.status.as_str(),
                ts(&session.started_at)
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                InterviewError::DuplicateActiveSession {
                    candidate_id: candidate_id.to_string(),
                }
            } else {
                e.into()
            }
        })?;
        tx.commit()?;
        Ok(session)
    }

    fn find_session(&self, id: &str) -> Result<Option<InterviewSession>> {
        let conn = self.lock();
        let s = conn
            .query_row(
                "SELECT id, candidate_id, tech_stack, status, started_at, ended_at
                 FROM sessions WHERE id = ?1",
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(s)
    }

    fn find_active_session(&self, candidate_id: &str) -> Result<Option<InterviewSession>> {
        let conn = self.lock();
        let s = conn
            .query_row(
                "SELECT id, candidate_id, tech_stack, status, started_at, ended_at
                 FROM sessions
                 WHERE candidate_id = ?1 AND status IN ('pending', 'in-progress')
                 LIMIT 1",
                params![candidate_id],
                session_from_row,
            )
            .optional()?;
        Ok(s)
    }

    fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<InterviewSession>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, candidate_id, tech_stack, status, started_at, ended_at
             FROM sessions
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY started_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![status.map(|s| s.as_str())], session_from_row)?;
        collect(rows)
    }

    fn update_session_status(
        &self,
        id: &str,
        expected: SessionStatus,
        next: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE sessions SET status = ?1, ended_at = COALESCE(?2, ended_at)
             WHERE id = ?3 AND status = ?4",
            params![
                next.as_str(),
                ended_at.as_ref().map(ts),
                id,
                expected.as_str()
            ],
        )?;
        if changed == 1 {
            return Ok(());
        }

        let exists: Option<String> = conn
            .query_row(
                "SELECT status FROM sessions WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        match exists {
            None => Err(InterviewError::not_found("session", id)),
            Some(_) => Err(InterviewError::Conflict {
                session_id: id.to_string(),
                expected,
            }),
        }
    }

    fn create_response(
        &self,
        session_id: &str,
        question_id: &str,
        audio_path: &str,
    ) -> Result<Response> {
        let r = Response {
            id: new_id(),
            session_id: session_id.to_string(),
            question_id: question_id.to_string(),
            audio_path: audio_path.to_string(),
            evaluation: EvaluationState::Pending,
            created_at: Utc::now(),
        };
        let conn = self.lock();
        conn.execute(
            "INSERT INTO responses(id, session_id, question_id, audio_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![r.id, r.session_id, r.question_id, r.audio_path, ts(&r.created_at)],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                InterviewError::DuplicateResponse {
                    session_id: session_id.to_string(),
                    question_id: question_id.to_string(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(r)
    }

    fn find_responses(&self, session_id: &str) -> Result<Vec<Response>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, question_id, audio_path, transcription, score, justification, created_at
             FROM responses WHERE session_id = ?1
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map(params![session_id], response_from_row)?;
        collect(rows)
    }

    fn update_response_evaluation(&self, id: &str, evaluation: &EvaluationState) -> Result<()> {
        let conn = self.lock();
        // One statement: readers see either the old or the new triple.
        let changed = conn.execute(
            "UPDATE responses SET transcription = ?1, score = ?2, justification = ?3 WHERE id = ?4",
            params![
                evaluation.transcription(),
                evaluation.score().map(i64::from),
                evaluation.justification(),
                id
            ],
        )?;
        if changed == 0 {
            return Err(InterviewError::not_found("response", id));
        }
        Ok(())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::<dyn std::error::Error + Send + Sync>::from(msg),
    )
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<Candidate> {
    let role: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(Candidate {
        id: row.get(0)?,
        username: row.get(1)?,
        role: Role::parse(&role).ok_or_else(|| conversion_error(2, format!("bad role {}", role)))?,
        created_at: parse_ts(3, &created_at)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    let created_at: String = row.get(4)?;
    Ok(Question {
        id: row.get(0)?,
        text: row.get(1)?,
        tech_stack: row.get(2)?,
        created_by: row.get(3)?,
        created_at: parse_ts(4, &created_at)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<InterviewSession> {
    let status: String = row.get(3)?;
    let started_at: String = row.get(4)?;
    let ended_at: Option<String> = row.get(5)?;
    Ok(InterviewSession {
        id: row.get(0)?,
        candidate_id: row.get(1)?,
        tech_stack: row.get(2)?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| conversion_error(3, format!("bad status {}", status)))?,
        started_at: parse_ts(4, &started_at)?,
        ended_at: ended_at.as_deref().map(|s| parse_ts(5, s)).transpose()?,
    })
}

fn response_from_row(row: &Row<'_>) -> rusqlite::Result<Response> {
    let created_at: String = row.get(7)?;
    Ok(Response {
        id: row.get(0)?,
        session_id: row.get(1)?,
        question_id: row.get(2)?,
        audio_path: row.get(3)?,
        evaluation: EvaluationState::from_columns(row.get(4)?, row.get(5)?, row.get(6)?),
        created_at: parse_ts(7, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let s = Store::memory().unwrap();
        s.init_schema().unwrap();
        s
    }

    #[test]
    fn optimistic_status_update() {
        let s = store();
        let c = s.create_candidate("ada", Role::Candidate).unwrap();
        let session = s.create_session(&c.id, "Rust", Utc::now()).unwrap();

        s.update_session_status(
            &session.id,
            SessionStatus::Pending,
            SessionStatus::InProgress,
            None,
        )
        .unwrap();

        let err = s
            .update_session_status(
                &session.id,
                SessionStatus::Pending,
                SessionStatus::InProgress,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, InterviewError::Conflict { .. }));

        let err = s
            .update_session_status("nope", SessionStatus::Pending, SessionStatus::InProgress, None)
            .unwrap_err();
        assert!(matches!(err, InterviewError::NotFound { entity: "session", .. }));
    }

    #[test]
    fn ended_at_is_kept_once_set() {
        let s = store();
        let c = s.create_candidate("bob", Role::Candidate).unwrap();
        let session = s.create_session(&c.id, "Go", Utc::now()).unwrap();
        let end = Utc::now();
        s.update_session_status(&session.id, SessionStatus::Pending, SessionStatus::InProgress, None)
            .unwrap();
        s.update_session_status(
            &session.id,
            SessionStatus::InProgress,
            SessionStatus::Completed,
            Some(end),
        )
        .unwrap();
        s.update_session_status(&session.id, SessionStatus::Completed, SessionStatus::Evaluated, None)
            .unwrap();

        let loaded = s.find_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Evaluated);
        assert_eq!(loaded.ended_at, Some(end));
    }

    #[test]
    fn second_active_session_is_rejected() {
        let s = store();
        let c = s.create_candidate("cy", Role::Candidate).unwrap();
        s.create_session(&c.id, "React", Utc::now()).unwrap();
        let err = s.create_session(&c.id, "React", Utc::now()).unwrap_err();
        assert!(matches!(err, InterviewError::DuplicateActiveSession { .. }));
    }

    #[test]
    fn duplicate_response_per_question_is_rejected() {
        let s = store();
        let c = s.create_candidate("dee", Role::Candidate).unwrap();
        let session = s.create_session(&c.id, "Rust", Utc::now()).unwrap();
        s.create_response(&session.id, "q1", "/uploads/a.webm").unwrap();
        let err = s
            .create_response(&session.id, "q1", "/uploads/b.webm")
            .unwrap_err();
        assert!(matches!(err, InterviewError::DuplicateResponse { .. }));
    }

    #[test]
    fn evaluation_write_is_readable_as_one_state() {
        let s = store();
        let c = s.create_candidate("eve", Role::Candidate).unwrap();
        let session = s.create_session(&c.id, "Rust", Utc::now()).unwrap();
        let r = s.create_response(&session.id, "q1", "/a.webm").unwrap();

        let state = EvaluationState::Evaluated {
            transcription: "ownership moves values".into(),
            score: crate::model::Score::new(9).unwrap(),
            justification: "precise".into(),
        };
        s.update_response_evaluation(&r.id, &state).unwrap();

        let loaded = s.find_responses(&session.id).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].evaluation, state);
    }

    #[test]
    fn tech_stacks_are_distinct_and_sorted() {
        let s = store();
        s.create_question("What is a hook?", "React", "admin").unwrap();
        s.create_question("What is JSX?", "React", "admin").unwrap();
        s.create_question("What is a trait?", "Rust", "admin").unwrap();
        assert_eq!(s.list_tech_stacks().unwrap(), vec!["React", "Rust"]);
        assert_eq!(s.questions_for_stack("React").unwrap().len(), 2);
    }
}
