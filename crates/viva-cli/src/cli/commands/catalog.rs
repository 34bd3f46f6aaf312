use super::{exit_codes, print_json, Context};
use crate::cli::args::{CandidateSub, QuestionSub};
use viva_core::model::Role;
use viva_core::InterviewError;

pub fn cmd_candidate(ctx: &Context, cmd: CandidateSub) -> anyhow::Result<i32> {
    match cmd {
        CandidateSub::Add { username, admin } => {
            if username.trim().is_empty() {
                return Err(InterviewError::InvalidInput("username is required".into()).into());
            }
            let role = if admin { Role::Admin } else { Role::Candidate };
            let candidate = ctx.store.create_candidate(username.trim(), role)?;
            print_json(&candidate)?;
        }
        CandidateSub::List => print_json(&ctx.store.list_candidates()?)?,
    }
    Ok(exit_codes::OK)
}

pub fn cmd_question(ctx: &Context, cmd: QuestionSub) -> anyhow::Result<i32> {
    match cmd {
        QuestionSub::Add {
            stack,
            text,
            created_by,
        } => {
            if stack.trim().is_empty() || text.trim().is_empty() {
                return Err(InterviewError::InvalidInput(
                    "question text and tech stack are required".into(),
                )
                .into());
            }
            let question = ctx
                .store
                .create_question(text.trim(), stack.trim(), &created_by)?;
            print_json(&question)?;
        }
        QuestionSub::Stacks => print_json(&ctx.store.list_tech_stacks()?)?,
        QuestionSub::List { stack } => print_json(&ctx.store.questions_for_stack(&stack)?)?,
    }
    Ok(exit_codes::OK)
}
