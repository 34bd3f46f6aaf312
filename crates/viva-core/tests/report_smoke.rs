mod common;

use common::*;
use std::sync::Arc;
use viva_core::engine::PipelinePolicy;
use viva_core::model::{Score, SessionStatus};
use viva_core::providers::llm::FakeClient;
use viva_core::providers::transcription::FakeTranscriber;
use viva_core::report::console::render_report;
use viva_core::report::{build_report, Field, UNKNOWN};
use viva_core::storage::EntityStore;
use viva_core::InterviewError;

#[test]
fn unevaluated_session_reports_pending_fields() -> anyhow::Result<()> {
    let fx = completed_session(Arc::new(memory_store()), 2);

    let report = build_report(fx.store.as_ref(), &fx.session.id)?;

    assert_eq!(report.session.candidate, "candidate-a");
    assert_eq!(report.session.status, SessionStatus::Completed);
    assert_eq!(report.entries.len(), 2);
    for (entry, q) in report.entries.iter().zip(&fx.questions) {
        assert_eq!(entry.question, q.text);
        assert_eq!(entry.transcription, Field::Pending);
        assert_eq!(entry.score, Field::Pending);
        assert_eq!(entry.justification, Field::Pending);
    }
    assert_eq!(report.average_score, None);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["entries"][0]["score"], "pending");
    assert_eq!(json["entries"][0]["transcription"], "pending");
    assert_eq!(json["session"]["status"], "completed");
    assert!(render_report(&report).contains("No scored answers yet"));
    Ok(())
}

#[tokio::test]
async fn evaluated_session_reports_scores_in_submission_order() -> anyhow::Result<()> {
    let fx = completed_session(Arc::new(memory_store()), 3);
    let client = Arc::new(
        FakeClient::new("Score: 6\nJustification: Partially correct.")
            .reply_when(default_transcript(1), "Score: 9\nJustification: Precise.")
            .reply_when(default_transcript(3), "no verdict here"),
    );
    let p = pipeline(
        &fx.lifecycle,
        Arc::new(FakeTranscriber::new()),
        client,
        PipelinePolicy::default(),
    );
    p.run_evaluation(&fx.session.id).await?;

    let report = build_report(fx.store.as_ref(), &fx.session.id)?;

    assert_eq!(report.session.status, SessionStatus::Evaluated);
    assert!(report.session.ended_at.is_some());
    let ids: Vec<_> = report.entries.iter().map(|e| e.response_id.clone()).collect();
    let expected: Vec<_> = fx.responses.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, expected);

    assert_eq!(report.entries[0].score, Field::Ready(Score::new(9).unwrap()));
    assert_eq!(report.entries[0].justification, Field::Ready("Precise.".to_string()));
    assert_eq!(report.entries[1].score, Field::Ready(Score::new(6).unwrap()));

    // Unparseable verdict: transcript kept, score withheld.
    let third = &report.entries[2];
    assert_eq!(third.transcription, Field::Ready(default_transcript(3)));
    assert_eq!(third.score, Field::Pending);
    assert_eq!(third.justification, Field::Pending);

    assert_eq!(report.scored(), 2);
    assert_eq!(report.average_score, Some(7.5));

    let text = render_report(&report);
    assert!(text.contains("Candidate:  candidate-a"));
    assert!(text.contains("Score:         9/10"));
    assert!(text.contains("Score:         (pending)"));
    assert!(text.contains("Average score: 7.5 over 2 of 3 answers"));
    Ok(())
}

#[test]
fn unknown_question_is_labelled() -> anyhow::Result<()> {
    let fx = completed_session(Arc::new(memory_store()), 1);
    fx.store
        .create_response(&fx.session.id, "retired-question", "/uploads/late.webm")?;

    let report = build_report(fx.store.as_ref(), &fx.session.id)?;

    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[1].question, UNKNOWN);
    assert_eq!(report.entries[1].question_id, "retired-question");
    Ok(())
}

#[test]
fn missing_session_is_not_found() {
    let store = memory_store();
    let err = build_report(&store, "nope").unwrap_err();
    assert!(matches!(err, InterviewError::NotFound { entity: "session", .. }));
}
