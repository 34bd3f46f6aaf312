use super::{Field, Report};
use crate::model::{ResponseOutcome, RunSummary};
use std::fmt::Write;

pub fn print_summary(summary: &RunSummary) {
    eprintln!(
        "\nEvaluated session {} ({} responses)",
        summary.session_id,
        summary.results.len()
    );
    for r in &summary.results {
        match &r.outcome {
            ResponseOutcome::Evaluated { score } => {
                eprintln!("✅ {:<38} score {}", r.response_id, score)
            }
            ResponseOutcome::AlreadyEvaluated => {
                eprintln!("⏭️  {:<38} already evaluated", r.response_id)
            }
            ResponseOutcome::MissingQuestion { question_id } => {
                eprintln!("⏭️  {:<38} question {} missing", r.response_id, question_id)
            }
            ResponseOutcome::Unresolved { reason } => {
                eprintln!("⚠️  {:<38} unresolved: {}", r.response_id, reason)
            }
            ResponseOutcome::Failed { reason } => {
                eprintln!("❌ {:<38} failed: {}", r.response_id, reason)
            }
        }
    }
    eprintln!(
        "\nSummary: {} attempted, {} succeeded, {} failed, {} skipped",
        summary.attempted, summary.succeeded, summary.failed, summary.skipped
    );
}

fn field(f: &Field<String>) -> &str {
    match f {
        Field::Ready(s) => s,
        Field::Pending => "(pending)",
    }
}

pub fn render_report(report: &Report) -> String {
    let s = &report.session;
    let mut out = String::new();
    let _ = writeln!(out, "Interview {}", s.id);
    let _ = writeln!(out, "  Candidate:  {}", s.candidate);
    let _ = writeln!(out, "  Tech stack: {}", s.tech_stack);
    let _ = writeln!(out, "  Status:     {}", s.status);
    let _ = writeln!(out, "  Started:    {}", s.started_at.to_rfc3339());
    if let Some(end) = &s.ended_at {
        let _ = writeln!(out, "  Ended:      {}", end.to_rfc3339());
    }

    for (i, e) in report.entries.iter().enumerate() {
        let score = match &e.score {
            Field::Ready(sc) => format!("{}/10", sc),
            Field::Pending => "(pending)".to_string(),
        };
        let _ = writeln!(out, "\n{}. {}", i + 1, e.question);
        let _ = writeln!(out, "   Answer:        {}", field(&e.transcription));
        let _ = writeln!(out, "   Score:         {}", score);
        let _ = writeln!(out, "   Justification: {}", field(&e.justification));
    }

    match report.average_score {
        Some(avg) => {
            let _ = writeln!(
                out,
                "\nAverage score: {:.1} over {} of {} answers",
                avg,
                report.scored(),
                report.entries.len()
            );
        }
        None => {
            let _ = writeln!(out, "\nNo scored answers yet");
        }
    }
    out
}
