use crate::errors::{InterviewError, Result};
use crate::model::{Score, SessionStatus};
use crate::storage::EntityStore;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

pub mod console;

pub const UNKNOWN: &str = "Unknown";

/// A report value that may not have been produced yet.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Ready(T),
    Pending,
}

impl<T> Field<T> {
    pub fn from_option(v: Option<T>) -> Self {
        match v {
            Some(v) => Field::Ready(v),
            None => Field::Pending,
        }
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Field::Ready(v) => Some(v),
            Field::Pending => None,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Field::Ready(v) => v.serialize(serializer),
            Field::Pending => serializer.serialize_str("pending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMeta {
    pub id: String,
    pub candidate: String,
    pub tech_stack: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub response_id: String,
    pub question_id: String,
    pub question: String,
    pub audio_path: String,
    pub transcription: Field<String>,
    pub score: Field<Score>,
    pub justification: Field<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub session: SessionMeta,
    pub entries: Vec<ReportEntry>,
    pub average_score: Option<f64>,
}

impl Report {
    pub fn scored(&self) -> usize {
        self.entries.iter().filter(|e| e.score.as_ready().is_some()).count()
    }
}

/// Session metadata plus one entry per Response, in submission order.
pub fn build_report(store: &dyn EntityStore, session_id: &str) -> Result<Report> {
    let session = store
        .find_session(session_id)?
        .ok_or_else(|| InterviewError::not_found("session", session_id))?;
    let candidate = store
        .find_candidate(&session.candidate_id)?
        .map(|c| c.username)
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut entries = Vec::new();
    for r in store.find_responses(session_id)? {
        let question = store
            .find_question(&r.question_id)?
            .map(|q| q.text)
            .unwrap_or_else(|| UNKNOWN.to_string());
        entries.push(ReportEntry {
            response_id: r.id,
            question_id: r.question_id,
            question,
            audio_path: r.audio_path,
            transcription: Field::from_option(r.evaluation.transcription().map(str::to_string)),
            score: Field::from_option(r.evaluation.score()),
            justification: Field::from_option(r.evaluation.justification().map(str::to_string)),
        });
    }

    let scores: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.score.as_ready().map(|s| s.get() as f64))
        .collect();
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    Ok(Report {
        session: SessionMeta {
            id: session.id,
            candidate,
            tech_stack: session.tech_stack,
            status: session.status,
            started_at: session.started_at,
            ended_at: session.ended_at,
        },
        entries,
        average_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_fields_serialize_as_pending() {
        let f: Field<String> = Field::Pending;
        assert_eq!(serde_json::to_value(&f).unwrap(), serde_json::json!("pending"));
        let s = Field::Ready(Score::new(6).unwrap());
        assert_eq!(serde_json::to_value(&s).unwrap(), serde_json::json!(6));
    }
}
