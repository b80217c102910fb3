use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use dayplan_core::Database;

use super::plan::generate;
use super::timer::countdown;
use super::{print_plan, CliResult};

#[derive(Args)]
pub struct RunArgs {
    /// JSON file with the planning request
    pub file: PathBuf,
    /// Block index to start from
    #[arg(short, long, default_value = "0")]
    pub start: usize,
    /// Do not record the session in history
    #[arg(long)]
    pub no_save: bool,
    /// Free-form note stored with the session
    #[arg(long)]
    pub notes: Option<String>,
}

pub fn run(args: RunArgs) -> CliResult {
    let response = generate(&args.file, false)?;
    print_plan(&response);

    if response.blocks.is_empty() {
        return Err("nothing to run: the plan has no blocks".into());
    }

    let (session_id, engine) = countdown(response.blocks.clone(), args.start)?;

    if args.no_save {
        return Ok(());
    }
    let date = response
        .blocks
        .first()
        .map(|b| b.start.date_naive())
        .unwrap_or_else(|| Utc::now().date_naive());

    // History is best effort; a finished countdown is never reported as failed.
    match Database::open().and_then(|db| {
        db.record_session(
            &session_id,
            date,
            &response.blocks,
            engine.completed_blocks(),
            &response.summary,
            args.notes.as_deref(),
        )
        .map_err(Into::into)
    }) {
        Ok(_) => println!("Session saved"),
        Err(e) => {
            tracing::warn!(error = %e, "could not save session");
            eprintln!("warning: could not save session: {e}");
        }
    }
    Ok(())
}
