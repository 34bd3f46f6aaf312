use crate::errors::{InterviewError, Result};
use crate::model::Score;
use crate::providers::llm::LlmClient;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Parsed scoring reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Scored { score: Score, justification: String },
    /// The engine answered but the reply does not carry a usable score and
    /// justification. The Response stays retry-eligible.
    Unresolved { reason: String },
}

#[derive(Clone)]
pub struct Scorer {
    client: Arc<dyn LlmClient>,
}

impl Scorer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub async fn score(&self, question: &str, transcript: &str) -> Result<Verdict> {
        let prompt = build_prompt(question, transcript);
        let resp = self
            .client
            .complete(&prompt)
            .await
            .map_err(|e| InterviewError::ScoringFailed(format!("{:#}", e)))?;
        Ok(parse_reply(&resp.text))
    }
}

pub fn build_prompt(question: &str, transcript: &str) -> String {
    format!(
        "You are an expert interviewer grading a candidate's spoken answer to a technical interview question.\n\
         \n\
         Question: \"{question}\"\n\
         \n\
         Candidate's answer (transcribed): \"{transcript}\"\n\
         \n\
         Rate the answer from 1 to 10, where 1 is completely incorrect and 10 is a perfect answer, \
         and explain the rating in detail.\n\
         Reply in exactly this format:\n\
         Score: <integer between 1 and 10>\n\
         Justification: <your detailed justification>"
    )
}

fn score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bscore\s*:\s*\[?\s*([+-]?\d+)").expect("static regex"))
}

fn justification_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\bjustification\s*:\s*(.+)$").expect("static regex"))
}

pub fn parse_reply(text: &str) -> Verdict {
    let Some(raw_score) = score_re().captures(text).and_then(|c| c.get(1)) else {
        return Verdict::Unresolved {
            reason: "reply has no 'Score:' token".into(),
        };
    };
    let Ok(value) = raw_score.as_str().parse::<i64>() else {
        return Verdict::Unresolved {
            reason: format!("score '{}' is not a number", raw_score.as_str()),
        };
    };
    let Some(score) = Score::new(value) else {
        return Verdict::Unresolved {
            reason: format!("score {} outside 1..=10", value),
        };
    };

    let justification = justification_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    match justification {
        Some(justification) => Verdict::Scored {
            score,
            justification,
        },
        None => Verdict::Unresolved {
            reason: "reply has no 'Justification:' text".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::FakeClient;

    #[test]
    fn parses_well_formed_reply() {
        let v = parse_reply("Score: 7\nJustification: Covers borrowing well.\nMisses lifetimes.");
        assert_eq!(
            v,
            Verdict::Scored {
                score: Score::new(7).unwrap(),
                justification: "Covers borrowing well.\nMisses lifetimes.".into()
            }
        );
    }

    #[test]
    fn tolerates_case_and_brackets() {
        let v = parse_reply("  score: [9]\n justification:   solid ");
        assert_eq!(
            v,
            Verdict::Scored {
                score: Score::new(9).unwrap(),
                justification: "solid".into()
            }
        );
    }

    #[test]
    fn missing_score_is_unresolved() {
        assert!(matches!(
            parse_reply("Justification: it was fine"),
            Verdict::Unresolved { .. }
        ));
        assert!(matches!(
            parse_reply("Score: excellent\nJustification: x"),
            Verdict::Unresolved { .. }
        ));
    }

    #[test]
    fn out_of_range_score_is_unresolved() {
        assert!(matches!(
            parse_reply("Score: 11\nJustification: x"),
            Verdict::Unresolved { .. }
        ));
        assert!(matches!(
            parse_reply("Score: 0\nJustification: x"),
            Verdict::Unresolved { .. }
        ));
        assert!(matches!(
            parse_reply("Score: 99999999999999999999999\nJustification: x"),
            Verdict::Unresolved { .. }
        ));
    }

    #[test]
    fn missing_justification_is_unresolved() {
        assert!(matches!(parse_reply("Score: 5"), Verdict::Unresolved { .. }));
        assert!(matches!(
            parse_reply("Score: 5\nJustification:   "),
            Verdict::Unresolved { .. }
        ));
    }

    #[test]
    fn prompt_carries_question_and_answer() {
        let p = build_prompt("What is a lifetime?", "a scope for references");
        assert!(p.contains("What is a lifetime?"));
        assert!(p.contains("a scope for references"));
        assert!(p.contains("Score:"));
        assert!(p.contains("Justification:"));
    }

    #[tokio::test]
    async fn client_errors_become_scoring_failures() {
        let client = FakeClient::new("Score: 5\nJustification: ok").fail_when("boom", "HTTP 503");
        let scorer = Scorer::new(Arc::new(client));
        let err = scorer.score("q", "boom").await.unwrap_err();
        assert!(matches!(err, InterviewError::ScoringFailed(ref m) if m.contains("503")));

        let v = scorer.score("q", "fine").await.unwrap();
        assert!(matches!(v, Verdict::Scored { .. }));
    }
}
