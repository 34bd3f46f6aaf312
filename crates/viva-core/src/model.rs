use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Candidate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Candidate => "candidate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "candidate" => Some(Role::Candidate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "evaluated")]
    Evaluated,
}

impl SessionStatus {
    pub const ACTIVE: [SessionStatus; 2] = [SessionStatus::Pending, SessionStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Evaluated => "evaluated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SessionStatus::Pending),
            "in-progress" | "in_progress" => Some(SessionStatus::InProgress),
            "completed" => Some(SessionStatus::Completed),
            "evaluated" => Some(SessionStatus::Evaluated),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a caller may request on a session. The `completed -> evaluated`
/// step is not an action: only the evaluation pipeline performs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Join,
    Complete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Join => f.write_str("join"),
            Action::Complete => f.write_str("complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Candidate(String),
    Operator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: String,
    pub candidate_id: String,
    pub tech_stack: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub tech_stack: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Interview score, always within 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(u8);

impl Score {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 10;

    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(Score(value as u8))
        } else {
            None
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score {} outside 1..=10", value))
    }
}

impl From<Score> for i64 {
    fn from(s: Score) -> i64 {
        s.0 as i64
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Evaluation fields of a Response. Score and justification only ever exist
/// together; a transcript may exist alone when the scoring reply was unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EvaluationState {
    #[default]
    Pending,
    Transcribed {
        transcription: String,
    },
    Evaluated {
        transcription: String,
        score: Score,
        justification: String,
    },
}

impl EvaluationState {
    pub fn is_evaluated(&self) -> bool {
        matches!(self, EvaluationState::Evaluated { .. })
    }

    pub fn transcription(&self) -> Option<&str> {
        match self {
            EvaluationState::Pending => None,
            EvaluationState::Transcribed { transcription }
            | EvaluationState::Evaluated { transcription, .. } => Some(transcription),
        }
    }

    pub fn score(&self) -> Option<Score> {
        match self {
            EvaluationState::Evaluated { score, .. } => Some(*score),
            _ => None,
        }
    }

    pub fn justification(&self) -> Option<&str> {
        match self {
            EvaluationState::Evaluated { justification, .. } => Some(justification),
            _ => None,
        }
    }

    /// Rebuilds the state from stored columns. Any combination other than the
    /// three legal shapes is treated as not yet evaluated.
    pub fn from_columns(
        transcription: Option<String>,
        score: Option<i64>,
        justification: Option<String>,
    ) -> Self {
        match (transcription, score.and_then(Score::new), justification) {
            (Some(t), Some(score), Some(justification)) => EvaluationState::Evaluated {
                transcription: t,
                score,
                justification,
            },
            (Some(t), None, None) => EvaluationState::Transcribed { transcription: t },
            _ => EvaluationState::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub session_id: String,
    pub question_id: String,
    pub audio_path: String,
    #[serde(flatten)]
    pub evaluation: EvaluationState,
    pub created_at: DateTime<Utc>,
}

/// Per-Response result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    Evaluated { score: Score },
    AlreadyEvaluated,
    MissingQuestion { question_id: String },
    Unresolved { reason: String },
    Failed { reason: String },
}

impl ResponseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Evaluated { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ResponseOutcome::Unresolved { .. } | ResponseOutcome::Failed { .. }
        )
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ResponseOutcome::AlreadyEvaluated | ResponseOutcome::MissingQuestion { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseResult {
    pub response_id: String,
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub session_id: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<ResponseResult>,
}

impl RunSummary {
    pub fn from_results(session_id: &str, results: Vec<ResponseResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        let failed = results.iter().filter(|r| r.outcome.is_failure()).count();
        let skipped = results.iter().filter(|r| r.outcome.is_skip()).count();
        Self {
            session_id: session_id.to_string(),
            attempted: succeeded + failed,
            succeeded,
            failed,
            skipped,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        for s in [
            SessionStatus::Pending,
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Evaluated,
        ] {
            assert_eq!(SessionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SessionStatus::parse("archived"), None);
    }

    #[test]
    fn score_bounds() {
        assert!(Score::new(0).is_none());
        assert!(Score::new(11).is_none());
        assert_eq!(Score::new(1).map(|s| s.get()), Some(1));
        assert_eq!(Score::new(10).map(|s| s.get()), Some(10));
        assert!(serde_json::from_str::<Score>("42").is_err());
    }

    #[test]
    fn evaluation_state_from_columns() {
        let full = EvaluationState::from_columns(Some("t".into()), Some(7), Some("ok".into()));
        assert!(full.is_evaluated());
        assert_eq!(full.score().map(|s| s.get()), Some(7));

        let transcript_only = EvaluationState::from_columns(Some("t".into()), None, None);
        assert_eq!(transcript_only.transcription(), Some("t"));
        assert!(transcript_only.score().is_none());

        assert_eq!(
            EvaluationState::from_columns(None, None, None),
            EvaluationState::Pending
        );
    }

    #[test]
    fn summary_counts() {
        let results = vec![
            ResponseResult {
                response_id: "r1".into(),
                outcome: ResponseOutcome::Evaluated {
                    score: Score::new(8).unwrap(),
                },
            },
            ResponseResult {
                response_id: "r2".into(),
                outcome: ResponseOutcome::Unresolved {
                    reason: "missing score".into(),
                },
            },
            ResponseResult {
                response_id: "r3".into(),
                outcome: ResponseOutcome::AlreadyEvaluated,
            },
        ];
        let summary = RunSummary::from_results("s1", results);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
    }
}
