//! # Dayplan Core Library
//!
//! Core logic for the `dayplan` pomodoro day planner. Given workday
//! preferences, a task list and the day's fixed calendar events, the planner
//! produces a non-overlapping sequence of work, break and event blocks plus
//! summary statistics. Every operation is available through the standalone
//! `dayplan` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timeline**: interval merging and free-time computation inside the workday
//! - **Scoring**: priority, deadline urgency and morning deep-work bonus
//! - **Scheduler**: greedy packing of whole tasks into pomodoro cycles
//! - **Timer**: wall-clock state machine that runs a plan block by block
//! - **Storage**: TOML configuration and SQLite session history
//! - **Calendar**: iCalendar export of a plan
//!
//! ## Key Components
//!
//! - [`DayPlanner`]: Turns a validated [`PlanRequest`] into a [`PlanResponse`]
//! - [`PlanRequestInput`]: Raw JSON request, validated into a [`PlanRequest`]
//! - [`TimerEngine`] / [`SessionRegistry`]: Countdown over planned blocks
//! - [`Database`]: Session history and statistics
//! - [`Config`]: Default preferences and planner settings

pub mod calendar;
pub mod error;
pub mod events;
pub mod schedule;
pub mod scheduler;
pub mod scoring;
pub mod storage;
pub mod summary;
pub mod timer;
mod timeline;

pub use calendar::blocks_to_ics;
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, ValidationError};
pub use events::TimerEvent;
pub use schedule::{
    Block, BlockKind, Cadence, CalendarEvent, EnergyLevel, PlanRequest, PlanRequestInput,
    PlanResponse, Preferences, Task,
};
pub use scheduler::{plan_day, DayPlanner, PlannerOptions};
pub use storage::{Config, Database, SessionRecord, StorageStats};
pub use summary::PlanSummary;
pub use timer::{SessionRegistry, TimerEngine, TimerProgress, TimerState};
