use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::BlockKind;
use crate::timer::TimerState;

/// Every timer state change produces a TimerEvent.
/// Front ends print them; session history is built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    BlockStarted {
        block_index: usize,
        kind: BlockKind,
        title: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    BlockCompleted {
        block_index: usize,
        kind: BlockKind,
        title: String,
        at: DateTime<Utc>,
    },
    /// A calendar event in the plan; passed through without a countdown.
    EventPassed {
        block_index: usize,
        title: String,
        at: DateTime<Utc>,
    },
    BlockSkipped {
        from_block: usize,
        to_block: usize,
        at: DateTime<Utc>,
    },
    TimerStopped {
        block_index: usize,
        at: DateTime<Utc>,
    },
    PlanCompleted {
        completed_blocks: usize,
        completed_pomodoros: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        block_index: usize,
        kind: Option<BlockKind>,
        title: Option<String>,
        remaining_ms: u64,
        total_ms: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}
