use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "viva",
    version,
    about = "Interview sessions with transcribed, LLM-scored answers"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = "viva.yaml", env = "VIVA_CONFIG")]
    pub config: PathBuf,

    /// Overrides `database` from the config file and `VIVA_DB`
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Reject unknown config keys instead of warning
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config and create the database
    Init,
    Candidate(CandidateArgs),
    Question(QuestionArgs),
    Session(SessionArgs),
    /// Record a candidate's answer to a question
    Submit(SubmitArgs),
    /// Transcribe and score a completed session
    Evaluate(EvaluateArgs),
    Report(ReportArgs),
}

#[derive(clap::Args, Clone)]
pub struct CandidateArgs {
    #[command(subcommand)]
    pub cmd: CandidateSub,
}

#[derive(Subcommand, Clone)]
pub enum CandidateSub {
    Add {
        username: String,
        /// Register an operator account instead of a candidate
        #[arg(long)]
        admin: bool,
    },
    List,
}

#[derive(clap::Args, Clone)]
pub struct QuestionArgs {
    #[command(subcommand)]
    pub cmd: QuestionSub,
}

#[derive(Subcommand, Clone)]
pub enum QuestionSub {
    Add {
        #[arg(long)]
        stack: String,
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "admin")]
        created_by: String,
    },
    /// Distinct tech stacks in the question bank
    Stacks,
    List {
        #[arg(long)]
        stack: String,
    },
}

#[derive(clap::Args, Clone)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub cmd: SessionSub,
}

#[derive(Subcommand, Clone)]
pub enum SessionSub {
    Start {
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        stack: String,
    },
    Join {
        session_id: String,
        #[arg(long)]
        candidate: String,
    },
    /// Complete a session. Without --candidate the operator completes it.
    Complete {
        session_id: String,
        #[arg(long)]
        candidate: Option<String>,
    },
    List {
        /// pending | in-progress | completed | evaluated
        #[arg(long)]
        status: Option<String>,
    },
    Active {
        #[arg(long)]
        candidate: String,
    },
    Questions {
        session_id: String,
    },
}

#[derive(clap::Args, Clone)]
pub struct SubmitArgs {
    pub session_id: String,
    #[arg(long)]
    pub candidate: String,
    #[arg(long)]
    pub question: String,
    /// Upload reference, e.g. /uploads/audio/answer.webm
    #[arg(long)]
    pub audio: String,
}

#[derive(clap::Args, Clone)]
pub struct EvaluateArgs {
    pub session_id: String,

    /// Reprocess unresolved answers of an already evaluated session
    #[arg(long)]
    pub retry: bool,

    /// Scoring provider override (openai|huggingface|fake)
    #[arg(long, value_parser = ["openai", "huggingface", "fake"])]
    pub scorer: Option<String>,
}

#[derive(clap::Args, Clone)]
pub struct ReportArgs {
    pub session_id: String,

    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}
