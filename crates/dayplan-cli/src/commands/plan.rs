use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use dayplan_core::{blocks_to_ics, Config, DayPlanner, PlanResponse};

use super::{load_request, print_plan, CliResult};

#[derive(Args)]
pub struct PlanArgs {
    /// JSON file with the planning request
    pub file: PathBuf,
    /// Save the plan as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Export the plan to an iCalendar file
    #[arg(long)]
    pub ics: Option<PathBuf>,
    /// Start packing at the current time instead of the workday start
    #[arg(long)]
    pub now: bool,
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
    /// Suppress the plan table
    #[arg(short, long)]
    pub quiet: bool,
}

/// Validate the request file and plan it with the configured planner options.
pub fn generate(file: &std::path::Path, now: bool) -> CliResult<PlanResponse> {
    let config = Config::load_or_default();
    let request = load_request(file, &config)?;

    let mut options = config.planner_options();
    if now {
        options.start_at = Some(Utc::now().with_timezone(request.preferences.workday_start.offset()));
    }
    Ok(DayPlanner::with_options(options).plan(&request))
}

pub fn run(args: PlanArgs) -> CliResult {
    let response = generate(&args.file, args.now)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if !args.quiet {
        print_plan(&response);
    }

    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&response)?)?;
        eprintln!("plan saved to {}", path.display());
    }

    if let Some(path) = &args.ics {
        std::fs::write(path, blocks_to_ics(&response.blocks, None, None)?)?;
        eprintln!("calendar exported to {}", path.display());
    }
    Ok(())
}
