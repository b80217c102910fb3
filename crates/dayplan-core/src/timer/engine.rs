//! Timer engine that executes a produced plan block by block.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically and
//! for any sleeping in between.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |  ^
//!           v  |  (stop / start_from)
//!          Idle
//! Running -> Completed   (last block finished)
//! ```
//!
//! Event blocks are calendar markers: they are recorded as completed and
//! passed over without a countdown.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::events::TimerEvent;
use crate::schedule::{Block, BlockKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Progress report for a running plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerProgress {
    pub total_blocks: usize,
    pub completed_blocks: usize,
    pub current_block_index: usize,
    pub current_block: Option<String>,
    pub progress_percent: f64,
    pub is_running: bool,
}

/// Core timer engine.
///
/// Operates on wall-clock deltas -- no internal thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    blocks: Vec<Block>,
    state: TimerState,
    block_index: usize,
    /// Remaining time in milliseconds for the current block.
    remaining_ms: u64,
    /// Timestamp (ms since epoch) of the last flush while running.
    #[serde(default)]
    last_tick_epoch_ms: Option<u64>,
    /// Indices of blocks finished or skipped, in completion order.
    #[serde(default)]
    completed: Vec<usize>,
}

impl TimerEngine {
    /// Create a new engine over `blocks`, idle at the first block.
    pub fn new(blocks: Vec<Block>) -> Self {
        let remaining_ms = blocks.first().map(block_ms).unwrap_or(0);
        Self {
            blocks,
            state: TimerState::Idle,
            block_index: 0,
            remaining_ms,
            last_tick_epoch_ms: None,
            completed: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn block_index(&self) -> usize {
        self.block_index
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn completed_blocks(&self) -> &[usize] {
        &self.completed
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.blocks.get(self.block_index)
    }

    pub fn total_ms(&self) -> u64 {
        self.current_block().map(block_ms).unwrap_or(0)
    }

    /// Work blocks among the completed ones.
    pub fn completed_pomodoros(&self) -> usize {
        self.completed
            .iter()
            .filter(|&&i| self.blocks.get(i).is_some_and(|b| b.kind == BlockKind::Work))
            .count()
    }

    pub fn progress(&self) -> TimerProgress {
        let total = self.blocks.len();
        let done = self.completed.len();
        TimerProgress {
            total_blocks: total,
            completed_blocks: done,
            current_block_index: self.block_index,
            current_block: self.current_block().map(|b| b.title.clone()),
            progress_percent: if total == 0 {
                0.0
            } else {
                done as f64 / total as f64 * 100.0
            },
            is_running: self.is_running(),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> TimerEvent {
        let block = self.current_block();
        TimerEvent::StateSnapshot {
            state: self.state,
            block_index: self.block_index,
            kind: block.map(|b| b.kind),
            title: block.map(|b| b.title.clone()),
            remaining_ms: self.remaining_ms,
            total_ms: self.total_ms(),
            progress_pct: self.progress().progress_percent,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start (or restart) counting down at `index`.
    ///
    /// # Errors
    /// Returns [`SessionError::EmptyPlan`] without blocks and
    /// [`SessionError::StartOutOfBounds`] for an index past the end.
    pub fn start_from(&mut self, index: usize) -> Result<Vec<TimerEvent>, SessionError> {
        self.start_from_at(index, now_ms())
    }

    pub fn start_from_at(&mut self, index: usize, now: u64) -> Result<Vec<TimerEvent>, SessionError> {
        if self.blocks.is_empty() {
            return Err(SessionError::EmptyPlan);
        }
        if index >= self.blocks.len() {
            return Err(SessionError::StartOutOfBounds {
                index,
                len: self.blocks.len(),
            });
        }
        if self.state == TimerState::Running {
            return Ok(Vec::new());
        }

        self.jump_to(index);
        self.state = TimerState::Running;
        self.last_tick_epoch_ms = Some(now);

        let mut events = Vec::new();
        self.enter_current(&mut events);
        Ok(events)
    }

    pub fn pause(&mut self) -> Option<TimerEvent> {
        self.pause_at(now_ms())
    }

    pub fn pause_at(&mut self, now: u64) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            return None;
        }
        self.flush_elapsed(now);
        self.state = TimerState::Paused;
        self.last_tick_epoch_ms = None;
        Some(TimerEvent::TimerPaused {
            remaining_ms: self.remaining_ms,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<TimerEvent> {
        self.resume_at(now_ms())
    }

    pub fn resume_at(&mut self, now: u64) -> Option<TimerEvent> {
        if self.state != TimerState::Paused {
            return None;
        }
        self.state = TimerState::Running;
        self.last_tick_epoch_ms = Some(now);
        Some(TimerEvent::TimerResumed {
            remaining_ms: self.remaining_ms,
            at: Utc::now(),
        })
    }

    /// Mark the current block done without waiting and move on.
    pub fn skip(&mut self) -> Vec<TimerEvent> {
        self.skip_at(now_ms())
    }

    pub fn skip_at(&mut self, now: u64) -> Vec<TimerEvent> {
        if matches!(self.state, TimerState::Completed) || self.current_block().is_none() {
            return Vec::new();
        }
        let from = self.block_index;
        self.completed.push(from);
        self.advance();

        let mut events = vec![TimerEvent::BlockSkipped {
            from_block: from,
            to_block: self.block_index,
            at: Utc::now(),
        }];
        if self.state == TimerState::Running {
            self.last_tick_epoch_ms = Some(now);
            self.enter_current(&mut events);
        } else if self.current_block().is_none() {
            self.finish(&mut events);
        }
        events
    }

    /// Stop counting; the position is kept so `start_from` can pick it up.
    pub fn stop(&mut self) -> Option<TimerEvent> {
        self.stop_at(now_ms())
    }

    pub fn stop_at(&mut self, now: u64) -> Option<TimerEvent> {
        match self.state {
            TimerState::Running | TimerState::Paused => {
                if self.state == TimerState::Running {
                    self.flush_elapsed(now);
                }
                self.state = TimerState::Idle;
                self.last_tick_epoch_ms = None;
                Some(TimerEvent::TimerStopped {
                    block_index: self.block_index,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Call periodically. Returns the events for every block boundary
    /// crossed since the last call.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        self.tick_at(now_ms())
    }

    pub fn tick_at(&mut self, now: u64) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        if self.state != TimerState::Running {
            return events;
        }

        let mut elapsed = self.take_elapsed(now);
        while self.state == TimerState::Running {
            if elapsed < self.remaining_ms {
                self.remaining_ms -= elapsed;
                break;
            }
            elapsed -= self.remaining_ms;
            self.remaining_ms = 0;

            if let Some(block) = self.current_block() {
                events.push(TimerEvent::BlockCompleted {
                    block_index: self.block_index,
                    kind: block.kind,
                    title: block.title.clone(),
                    at: Utc::now(),
                });
            }
            self.completed.push(self.block_index);
            self.advance();
            self.enter_current(&mut events);
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Announce the current block, passing over calendar markers, or finish
    /// the plan when the end is reached.
    fn enter_current(&mut self, events: &mut Vec<TimerEvent>) {
        while let Some(block) = self.current_block() {
            if block.kind != BlockKind::Event {
                events.push(TimerEvent::BlockStarted {
                    block_index: self.block_index,
                    kind: block.kind,
                    title: block.title.clone(),
                    duration_secs: self.remaining_ms / 1000,
                    at: Utc::now(),
                });
                return;
            }
            events.push(TimerEvent::EventPassed {
                block_index: self.block_index,
                title: block.title.clone(),
                at: Utc::now(),
            });
            self.completed.push(self.block_index);
            self.advance();
        }
        self.finish(events);
    }

    fn finish(&mut self, events: &mut Vec<TimerEvent>) {
        self.state = TimerState::Completed;
        self.last_tick_epoch_ms = None;
        events.push(TimerEvent::PlanCompleted {
            completed_blocks: self.completed.len(),
            completed_pomodoros: self.completed_pomodoros(),
            at: Utc::now(),
        });
    }

    fn take_elapsed(&mut self, now: u64) -> u64 {
        match self.last_tick_epoch_ms {
            Some(last) => {
                self.last_tick_epoch_ms = Some(now);
                now.saturating_sub(last)
            }
            None => 0,
        }
    }

    fn flush_elapsed(&mut self, now: u64) {
        let elapsed = self.take_elapsed(now);
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
    }

    fn jump_to(&mut self, index: usize) {
        if index != self.block_index || self.state == TimerState::Completed {
            self.block_index = index;
            self.remaining_ms = self.blocks.get(index).map(block_ms).unwrap_or(0);
        }
    }

    fn advance(&mut self) {
        self.block_index += 1;
        self.remaining_ms = self.blocks.get(self.block_index).map(block_ms).unwrap_or(0);
    }
}

fn block_ms(block: &Block) -> u64 {
    (block.end - block.start).num_milliseconds().max(0) as u64
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{CalendarEvent, Task};
    use chrono::{DateTime, Duration, FixedOffset};

    const MIN: u64 = 60_000;

    fn at(hh_mm: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2025-08-25T{hh_mm}:00+00:00")).unwrap()
    }

    fn plan() -> Vec<Block> {
        let task = Task::new(Some("t".into()), "Write report", 50).unwrap();
        let meeting = CalendarEvent::new(at("09:55"), at("10:30"), "Standup").unwrap();
        vec![
            Block::work(at("09:00"), Duration::minutes(25), &task),
            Block::rest(at("09:25"), at("09:30"), false),
            Block::work(at("09:30"), Duration::minutes(25), &task),
            Block::event(&meeting),
        ]
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::new(plan());
        assert_eq!(engine.state(), TimerState::Idle);

        let events = engine.start_from_at(0, 0).unwrap();
        assert!(matches!(events[0], TimerEvent::BlockStarted { block_index: 0, .. }));
        assert_eq!(engine.state(), TimerState::Running);

        engine.pause_at(10 * MIN).unwrap();
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.remaining_ms(), 15 * MIN);

        // Paused time does not count
        engine.resume_at(50 * MIN).unwrap();
        assert!(engine.tick_at(55 * MIN).is_empty());
        assert_eq!(engine.remaining_ms(), 10 * MIN);
    }

    #[test]
    fn tick_crosses_block_boundaries_and_passes_events() {
        let mut engine = TimerEngine::new(plan());
        engine.start_from_at(0, 0).unwrap();

        let events = engine.tick_at(26 * MIN);
        assert!(matches!(events[0], TimerEvent::BlockCompleted { block_index: 0, .. }));
        assert!(matches!(events[1], TimerEvent::BlockStarted { block_index: 1, kind: BlockKind::Break, .. }));
        assert_eq!(engine.remaining_ms(), 4 * MIN);

        let events = engine.tick_at(60 * MIN);
        let kinds: Vec<_> = events
            .iter()
            .map(|e| match e {
                TimerEvent::BlockCompleted { .. } => "completed",
                TimerEvent::BlockStarted { .. } => "started",
                TimerEvent::EventPassed { .. } => "event",
                TimerEvent::PlanCompleted { .. } => "done",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["completed", "started", "completed", "event", "done"]);
        assert_eq!(engine.state(), TimerState::Completed);
        assert_eq!(engine.completed_blocks(), &[0, 1, 2, 3]);
        assert_eq!(engine.completed_pomodoros(), 2);
        assert_eq!(engine.progress().progress_percent, 100.0);
    }

    #[test]
    fn skip_advances_block() {
        let mut engine = TimerEngine::new(plan());
        engine.start_from_at(0, 0).unwrap();
        let events = engine.skip_at(MIN);
        assert!(matches!(events[0], TimerEvent::BlockSkipped { from_block: 0, to_block: 1, .. }));
        assert_eq!(engine.block_index(), 1);
        assert_eq!(engine.remaining_ms(), 5 * MIN);
        assert_eq!(engine.completed_blocks(), &[0]);
    }

    #[test]
    fn stop_keeps_position_for_restart() {
        let mut engine = TimerEngine::new(plan());
        engine.start_from_at(1, 0).unwrap();
        engine.tick_at(2 * MIN);
        engine.stop_at(3 * MIN).unwrap();
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.block_index(), 1);
        assert_eq!(engine.remaining_ms(), 2 * MIN);

        engine.start_from_at(1, 10 * MIN).unwrap();
        assert_eq!(engine.remaining_ms(), 2 * MIN);
        assert!(!engine.progress().current_block.unwrap().is_empty());
    }

    #[test]
    fn start_validates_index() {
        let mut engine = TimerEngine::new(plan());
        assert_eq!(
            engine.start_from_at(9, 0).unwrap_err(),
            SessionError::StartOutOfBounds { index: 9, len: 4 }
        );
        let mut empty = TimerEngine::new(Vec::new());
        assert_eq!(empty.start_from_at(0, 0).unwrap_err(), SessionError::EmptyPlan);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::new(plan());
        match engine.snapshot() {
            TimerEvent::StateSnapshot {
                state,
                block_index,
                remaining_ms,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(block_index, 0);
                assert_eq!(remaining_ms, 25 * MIN);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
