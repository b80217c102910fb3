//! Task priority scoring.
//!
//! `score = 5 * priority + urgency + energy_match`, evaluated at a given
//! instant. The planner re-scores at its packing cursor for every placement
//! decision, so a task's effective score drifts as the day fills up.
//!
//! Urgency is unbounded for overdue work: every day past the
//! deadline adds one more point.

use chrono::{DateTime, FixedOffset, Timelike};

use crate::schedule::Task;

/// Weight applied to the 1..=5 user priority.
pub const PRIORITY_WEIGHT: i64 = 5;
/// Urgency of a task whose deadline is less than a day away.
pub const URGENCY_HORIZON_DAYS: i64 = 10;
/// Bonus for deep-work tasks scored during the morning focus window.
pub const DEEP_WORK_BONUS: i64 = 2;
/// Morning focus window, `[start, end)` hours in the instant's own offset.
pub const DEEP_WORK_HOURS: (u32, u32) = (9, 12);

const SECONDS_PER_DAY: i64 = 86_400;

/// Priority score of `task` at `instant`. Higher is more important.
pub fn score(task: &Task, instant: &DateTime<FixedOffset>) -> i64 {
    PRIORITY_WEIGHT * i64::from(task.priority) + urgency(task, instant) + energy_match(task, instant)
}

/// `10 - floor(days until deadline)`, or 0 without a deadline.
///
/// Not clamped: an overdue task has a negative day count, so its urgency keeps
/// growing past 10.
pub fn urgency(task: &Task, instant: &DateTime<FixedOffset>) -> i64 {
    match task.deadline {
        Some(deadline) => {
            let days = (deadline - *instant).num_seconds().div_euclid(SECONDS_PER_DAY);
            URGENCY_HORIZON_DAYS - days
        }
        None => 0,
    }
}

/// +2 for deep-work tasks when `instant` falls in the morning focus window.
pub fn energy_match(task: &Task, instant: &DateTime<FixedOffset>) -> i64 {
    let (from, to) = DEEP_WORK_HOURS;
    if task.requires_deep_work && (from..to).contains(&instant.hour()) {
        DEEP_WORK_BONUS
    } else {
        0
    }
}

/// Indices of `tasks` ordered by descending score at `instant`.
///
/// Sort key is `(-score, input_index)`: equal scores keep input order, which
/// makes tie-breaks reproducible.
pub fn rank(tasks: &[Task], instant: &DateTime<FixedOffset>) -> Vec<usize> {
    let mut order: Vec<(i64, usize)> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| (-score(task, instant), i))
        .collect();
    order.sort_unstable();
    order.into_iter().map(|(_, i)| i).collect()
}
