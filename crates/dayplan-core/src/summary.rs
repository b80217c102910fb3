//! Plan summary statistics.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::schedule::timestamp::clock_label;
use crate::schedule::{Block, BlockKind, Preferences, Task};

/// Reporting statistics for a produced plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Number of work blocks.
    pub total_pomodoros: u32,
    /// Minutes spent in short and long breaks.
    pub total_break_time: i64,
    /// Distinct tasks referenced by work blocks.
    pub scheduled_tasks: u32,
    /// Titles of tasks that got no work block, in input order.
    #[serde(default)]
    pub unscheduled_tasks: Vec<String>,
    /// Workday minutes not covered by work or breaks.
    pub free_time_minutes: i64,
    /// `HH:MM-HH:MM` windows of work blocks on deep-work tasks.
    #[serde(default)]
    pub deep_work_windows: Vec<String>,
    /// Whether packing started at the current time rather than the workday start.
    #[serde(default)]
    pub current_time_used: bool,
}

/// Aggregate `blocks` against the original task list.
pub fn build_summary(
    blocks: &[Block],
    tasks: &[Task],
    preferences: &Preferences,
    current_time_used: bool,
) -> PlanSummary {
    let work: Vec<&Block> = blocks.iter().filter(|b| b.kind == BlockKind::Work).collect();

    let total_break_time: i64 = blocks
        .iter()
        .filter(|b| b.kind.is_break())
        .map(Block::duration_minutes)
        .sum();

    let scheduled: HashSet<&str> = work.iter().filter_map(|b| b.task_id.as_deref()).collect();

    let unscheduled_tasks = tasks
        .iter()
        .filter(|t| !scheduled.contains(t.id.as_str()))
        .map(|t| t.title.clone())
        .collect();

    let occupied: i64 = blocks
        .iter()
        .filter(|b| b.kind != BlockKind::Event)
        .map(Block::duration_minutes)
        .sum();
    let free_time_minutes = (preferences.workday_minutes() - occupied).max(0);

    let deep_ids: HashSet<&str> = tasks
        .iter()
        .filter(|t| t.requires_deep_work)
        .map(|t| t.id.as_str())
        .collect();
    let deep_work_windows = work
        .iter()
        .filter(|b| b.task_id.as_deref().is_some_and(|id| deep_ids.contains(id)))
        .map(|b| format!("{}-{}", clock_label(&b.start), clock_label(&b.end)))
        .collect();

    PlanSummary {
        total_pomodoros: work.len() as u32,
        total_break_time,
        scheduled_tasks: scheduled.len() as u32,
        unscheduled_tasks,
        free_time_minutes,
        deep_work_windows,
        current_time_used,
    }
}
