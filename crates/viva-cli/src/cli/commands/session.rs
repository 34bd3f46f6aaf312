use super::{exit_codes, print_json, Context};
use crate::cli::args::{SessionSub, SubmitArgs};
use viva_core::model::{Actor, SessionStatus};
use viva_core::InterviewError;

pub fn cmd_session(ctx: &Context, cmd: SessionSub) -> anyhow::Result<i32> {
    let lc = &ctx.lifecycle;
    match cmd {
        SessionSub::Start { candidate, stack } => print_json(&lc.start_session(&candidate, &stack)?)?,
        SessionSub::Join {
            session_id,
            candidate,
        } => print_json(&lc.join(&session_id, &candidate)?)?,
        SessionSub::Complete {
            session_id,
            candidate,
        } => {
            let actor = candidate.map(Actor::Candidate).unwrap_or(Actor::Operator);
            print_json(&lc.complete(&session_id, &actor)?)?
        }
        SessionSub::List { status } => {
            let status = status
                .map(|s| {
                    SessionStatus::parse(&s)
                        .ok_or_else(|| InterviewError::InvalidInput(format!("unknown status '{}'", s)))
                })
                .transpose()?;
            print_json(&lc.list_sessions(status)?)?
        }
        SessionSub::Active { candidate } => match lc.active_session_for(&candidate)? {
            Some(session) => print_json(&session)?,
            None => {
                eprintln!("no active session for {}", candidate);
                return Ok(exit_codes::DOMAIN_ERROR);
            }
        },
        SessionSub::Questions { session_id } => {
            print_json(&lc.questions_for_session(&session_id)?)?
        }
    }
    Ok(exit_codes::OK)
}

pub fn cmd_submit(ctx: &Context, args: SubmitArgs) -> anyhow::Result<i32> {
    let response = ctx.lifecycle.submit_response(
        &args.session_id,
        &args.candidate,
        &args.question,
        &args.audio,
    )?;
    print_json(&response)?;
    Ok(exit_codes::OK)
}
