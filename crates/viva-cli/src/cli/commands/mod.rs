use super::args::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use viva_core::config::{load_or_default, write_sample_config, AppConfig};
use viva_core::storage::{EntityStore, Store};
use viva_core::{InterviewError, LifecycleManager};

pub mod catalog;
pub mod evaluate;
pub mod report;
pub mod session;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const DOMAIN_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

/// Loaded config plus an open, migrated store.
pub struct Context {
    pub cfg: AppConfig,
    pub store: Arc<dyn EntityStore>,
    pub lifecycle: LifecycleManager,
}

impl Context {
    fn open(config: &Path, db: Option<PathBuf>, strict: bool) -> anyhow::Result<Self> {
        let mut cfg = load_or_default(config, strict)?;
        if let Some(db) = db {
            cfg.database = db;
        }
        let store = Store::open(&cfg.database)?;
        store.init_schema()?;

        let store: Arc<dyn EntityStore> = Arc::new(store);
        Ok(Self {
            cfg,
            lifecycle: LifecycleManager::new(store.clone()),
            store,
        })
    }
}

/// Domain errors (illegal transitions, unknown ids, ...) exit with 1; config
/// and storage faults bubble up to `main` and exit with 2.
pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match run(cli).await {
        Ok(code) => Ok(code),
        Err(e) => match e.downcast_ref::<InterviewError>() {
            None | Some(InterviewError::Config(_)) | Some(InterviewError::Storage(_)) => Err(e),
            Some(err) => {
                eprintln!("error: {}", err);
                Ok(exit_codes::DOMAIN_ERROR)
            }
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let Cli {
        config,
        db,
        strict,
        cmd,
    } = cli;

    if matches!(cmd, Command::Init) {
        write_sample_config_if_missing(&config)?;
    }
    let ctx = Context::open(&config, db, strict)?;

    match cmd {
        Command::Init => {
            eprintln!("database ready at {}", ctx.cfg.database.display());
            Ok(exit_codes::OK)
        }
        Command::Candidate(args) => catalog::cmd_candidate(&ctx, args.cmd),
        Command::Question(args) => catalog::cmd_question(&ctx, args.cmd),
        Command::Session(args) => session::cmd_session(&ctx, args.cmd),
        Command::Submit(args) => session::cmd_submit(&ctx, args),
        Command::Evaluate(args) => evaluate::cmd_evaluate(&ctx, args).await,
        Command::Report(args) => report::cmd_report(&ctx, args),
    }
}

fn write_sample_config_if_missing(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_sample_config(path)?;
        eprintln!("created {}", path.display());
    } else {
        eprintln!("note: {} already exists", path.display());
    }
    Ok(())
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
