pub mod config;
pub mod export;
pub mod history;
pub mod plan;
pub mod run;
pub mod timer;

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use dayplan_core::schedule::timestamp::{clock_label, parse_timestamp};
use dayplan_core::{Block, Config, PlanRequest, PlanRequestInput, PlanResponse};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn read_file(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()).into())
}

/// Load and validate a planning request. Preferences missing from the file
/// come from the user's config, anchored on today's date.
pub fn load_request(path: &Path, config: &Config) -> CliResult<PlanRequest> {
    let input = PlanRequestInput::from_json(&read_file(path)?)?;
    let fallback = match input.preferences {
        Some(_) => None,
        None => {
            let today = Utc::now().with_timezone(&config.utc_offset()?).date_naive();
            tracing::debug!(%today, "using configured preferences");
            Some(config.preferences_for(today)?)
        }
    };
    Ok(input.validate(fallback.as_ref())?)
}

/// Load blocks from a saved plan: either `{"blocks": [...]}` or a bare array.
pub fn load_blocks(path: &Path) -> CliResult<Vec<Block>> {
    let value: serde_json::Value = serde_json::from_str(&read_file(path)?)?;
    let raw = match value {
        serde_json::Value::Object(mut obj) => obj
            .remove("blocks")
            .ok_or("plan file has no 'blocks' field")?,
        other => other,
    };
    let blocks: Vec<Block> = serde_json::from_value(raw)?;
    for (i, block) in blocks.iter().enumerate() {
        block.validate(&format!("blocks[{i}]"))?;
    }
    if blocks.is_empty() {
        return Err("no blocks found in plan file".into());
    }
    Ok(blocks)
}

pub fn parse_instant(field: &str, value: &str) -> CliResult<DateTime<FixedOffset>> {
    Ok(parse_timestamp(field, value)?)
}

pub fn print_plan(response: &PlanResponse) {
    println!("{:<13}  {:>8}  {:<10}  Activity", "Time", "Duration", "Type");
    for block in &response.blocks {
        println!(
            "{:<13}  {:>7}m  {:<10}  {}",
            format!("{} - {}", clock_label(&block.start), clock_label(&block.end)),
            block.duration_minutes(),
            block.kind.as_str(),
            block.title
        );
    }

    let summary = &response.summary;
    println!();
    println!("Summary");
    println!("  Pomodoros:       {}", summary.total_pomodoros);
    println!("  Break time:      {} min", summary.total_break_time);
    println!("  Scheduled tasks: {}", summary.scheduled_tasks);
    println!("  Free time:       {} min", summary.free_time_minutes);
    if !summary.unscheduled_tasks.is_empty() {
        println!("  Unscheduled:     {}", summary.unscheduled_tasks.join(", "));
    }
    if !summary.deep_work_windows.is_empty() {
        println!("  Deep work:       {}", summary.deep_work_windows.join(", "));
    }
    if summary.current_time_used {
        println!("  Started from the current time");
    }
}
