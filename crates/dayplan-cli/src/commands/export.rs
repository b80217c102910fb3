use std::path::PathBuf;

use clap::Args;
use dayplan_core::blocks_to_ics;

use super::{load_blocks, parse_instant, CliResult};

#[derive(Args)]
pub struct ExportArgs {
    /// JSON file with a generated plan
    pub file: PathBuf,
    /// Destination .ics file
    #[arg(long)]
    pub ics: PathBuf,
    /// Keep only blocks starting at or after this instant (ISO-8601 with offset)
    #[arg(long)]
    pub from: Option<String>,
    /// Keep only blocks ending at or before this instant (ISO-8601 with offset)
    #[arg(long)]
    pub to: Option<String>,
}

pub fn run(args: ExportArgs) -> CliResult {
    let blocks = load_blocks(&args.file)?;
    let from = args.from.as_deref().map(|v| parse_instant("from", v)).transpose()?;
    let to = args.to.as_deref().map(|v| parse_instant("to", v)).transpose()?;

    let ics = blocks_to_ics(&blocks, from.as_ref(), to.as_ref())?;
    std::fs::write(&args.ics, ics)?;
    println!("calendar exported to {}", args.ics.display());
    Ok(())
}
