//! Schedule types: planning preferences, tasks, fixed calendar events and the
//! blocks a plan is made of.
//!
//! Every constructor validates its input and returns a typed error instead of
//! producing a half-valid value. Requests read from JSON go through
//! [`request::PlanRequestInput::validate`], which reports every offending
//! field at once.

pub mod request;
pub mod timestamp;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use request::{EventInput, PlanRequest, PlanRequestInput, PlanResponse, PreferencesInput, TaskInput};

/// Default work unit length (minutes).
pub const DEFAULT_POMODORO_MIN: u32 = 25;
/// Default short break length (minutes).
pub const DEFAULT_BREAK_MIN: u32 = 5;
/// Default long break length (minutes).
pub const DEFAULT_LONG_BREAK_MIN: u32 = 15;
/// Default number of work units between long breaks.
pub const DEFAULT_CYCLES_PER_LONG_BREAK: u32 = 4;
/// Default task priority.
pub const DEFAULT_PRIORITY: u8 = 3;

/// Work/rest cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    pub pomodoro_min: u32,
    pub break_min: u32,
    pub long_break_min: u32,
    pub cycles_per_long_break: u32,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            pomodoro_min: DEFAULT_POMODORO_MIN,
            break_min: DEFAULT_BREAK_MIN,
            long_break_min: DEFAULT_LONG_BREAK_MIN,
            cycles_per_long_break: DEFAULT_CYCLES_PER_LONG_BREAK,
        }
    }
}

impl Cadence {
    fn check(&self, prefix: &str, errors: &mut Vec<ValidationError>) {
        let fields = [
            ("pomodoro_min", self.pomodoro_min),
            ("break_min", self.break_min),
            ("long_break_min", self.long_break_min),
            ("cycles_per_long_break", self.cycles_per_long_break),
        ];
        for (name, value) in fields {
            if value == 0 {
                errors.push(ValidationError::NonPositiveDuration {
                    field: format!("{prefix}{name}"),
                    value: 0,
                });
            }
        }
    }
}

/// Planning preferences for one workday. Immutable for a planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub workday_start: DateTime<FixedOffset>,
    pub workday_end: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub cadence: Cadence,
}

impl Preferences {
    /// Build validated preferences.
    ///
    /// # Errors
    /// Returns every offending field: an empty or inverted workday window and
    /// any zero-length cadence value.
    pub fn new(
        workday_start: DateTime<FixedOffset>,
        workday_end: DateTime<FixedOffset>,
        cadence: Cadence,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        Self::check_window(&workday_start, &workday_end, "", &mut errors);
        cadence.check("", &mut errors);
        if errors.is_empty() {
            Ok(Self {
                workday_start,
                workday_end,
                cadence,
            })
        } else {
            Err(errors)
        }
    }

    pub(crate) fn check_window(
        start: &DateTime<FixedOffset>,
        end: &DateTime<FixedOffset>,
        prefix: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        if start >= end {
            errors.push(ValidationError::InvalidTimeRange {
                field: format!("{prefix}workday_end"),
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
    }

    /// Length of the workday window in minutes.
    pub fn workday_minutes(&self) -> i64 {
        (self.workday_end - self.workday_start).num_minutes()
    }

    pub fn pomodoro(&self) -> Duration {
        Duration::minutes(i64::from(self.cadence.pomodoro_min))
    }

    pub fn short_break(&self) -> Duration {
        Duration::minutes(i64::from(self.cadence.break_min))
    }

    pub fn long_break(&self) -> Duration {
        Duration::minutes(i64::from(self.cadence.long_break_min))
    }
}

/// Energy a task demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Deep,
    #[default]
    Light,
}

/// A task to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Estimated effort in minutes (>= 1).
    pub estimate_min: u32,
    /// 1..=5, 5 highest.
    pub priority: u8,
    pub deadline: Option<DateTime<FixedOffset>>,
    pub energy: EnergyLevel,
    pub requires_deep_work: bool,
    pub notes: Option<String>,
}

impl Task {
    /// Create a task with default priority. A missing id is generated.
    ///
    /// # Errors
    /// Returns an error for an empty title or a zero estimate.
    pub fn new(
        id: Option<String>,
        title: impl Into<String>,
        estimate_min: u32,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle {
                field: "title".into(),
            });
        }
        if estimate_min == 0 {
            return Err(ValidationError::NonPositiveDuration {
                field: "estimate_min".into(),
                value: 0,
            });
        }
        Ok(Self {
            id: id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title,
            estimate_min,
            priority: DEFAULT_PRIORITY,
            deadline: None,
            energy: EnergyLevel::default(),
            requires_deep_work: false,
            notes: None,
        })
    }

    /// Set the priority.
    ///
    /// # Errors
    /// Returns an error when `priority` is outside 1..=5.
    pub fn with_priority(mut self, priority: u8) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&priority) {
            return Err(ValidationError::PriorityOutOfRange {
                field: "priority".into(),
                value: i64::from(priority),
            });
        }
        self.priority = priority;
        Ok(self)
    }

    pub fn with_deadline(mut self, deadline: DateTime<FixedOffset>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_energy(mut self, energy: EnergyLevel) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_deep_work(mut self, requires_deep_work: bool) -> Self {
        self.requires_deep_work = requires_deep_work;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Number of work units needed to cover the estimate.
    pub fn cycles_needed(&self, pomodoro_min: u32) -> u32 {
        self.estimate_min.div_ceil(pomodoro_min.max(1))
    }
}

/// A fixed, non-negotiable calendar commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub title: String,
    pub location: Option<String>,
}

impl CalendarEvent {
    /// Create a new calendar event.
    ///
    /// # Errors
    /// Returns an error for an empty title or when `start >= end`.
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        title: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle {
                field: "title".into(),
            });
        }
        if start >= end {
            return Err(ValidationError::InvalidTimeRange {
                field: "end".into(),
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self {
            start,
            end,
            title,
            location: None,
        })
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Kind of schedule block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Fixed calendar event, copied verbatim
    Event,
    /// One work unit on a task
    Work,
    /// Short break
    Break,
    /// Long break after every N work units
    LongBreak,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Work => "work",
            Self::Break => "break",
            Self::LongBreak => "long_break",
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Self::Break | Self::LongBreak)
    }
}

/// A unit of the produced schedule.
///
/// Duration is derived from `start`/`end`, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Block {
    /// Verbatim copy of a calendar event.
    pub fn event(event: &CalendarEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            kind: BlockKind::Event,
            title: event.title.clone(),
            task_id: None,
        }
    }

    pub fn work(start: DateTime<FixedOffset>, length: Duration, task: &Task) -> Self {
        Self {
            start,
            end: start + length,
            kind: BlockKind::Work,
            title: task.title.clone(),
            task_id: Some(task.id.clone()),
        }
    }

    pub fn rest(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>, long: bool) -> Self {
        let (kind, title) = if long {
            (BlockKind::LongBreak, "Long Break")
        } else {
            (BlockKind::Break, "Break")
        };
        Self {
            start,
            end,
            kind,
            title: title.to_string(),
            task_id: None,
        }
    }

    /// Get block duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Reject blocks loaded from outside with `start >= end`.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidTimeRange`] naming `field`.
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.start >= self.end {
            return Err(ValidationError::InvalidTimeRange {
                field: field.to_string(),
                start: self.start.to_rfc3339(),
                end: self.end.to_rfc3339(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn preferences_reject_inverted_window_and_zero_cadence() {
        let cadence = Cadence {
            pomodoro_min: 0,
            ..Cadence::default()
        };
        let errors = Preferences::new(
            at("2025-08-25T17:00:00+00:00"),
            at("2025-08-25T09:00:00+00:00"),
            cadence,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field(), "workday_end");
        assert_eq!(errors[1].field(), "pomodoro_min");
    }

    #[test]
    fn task_defaults() {
        let task = Task::new(None, "Write report", 50).unwrap();
        assert_eq!(task.priority, 3);
        assert_eq!(task.energy, EnergyLevel::Light);
        assert!(!task.requires_deep_work);
        assert!(!task.id.is_empty());
    }

    #[test]
    fn task_rejects_bad_fields() {
        assert!(Task::new(None, "   ", 10).is_err());
        assert!(Task::new(None, "x", 0).is_err());
        let task = Task::new(Some("t".into()), "x", 10).unwrap();
        assert!(task.clone().with_priority(0).is_err());
        assert!(task.clone().with_priority(6).is_err());
        assert_eq!(task.with_priority(5).unwrap().priority, 5);
    }

    #[test]
    fn cycles_round_up() {
        let task = Task::new(None, "x", 50).unwrap();
        assert_eq!(task.cycles_needed(25), 2);
        let task = Task::new(None, "x", 51).unwrap();
        assert_eq!(task.cycles_needed(25), 3);
        let task = Task::new(None, "x", 1).unwrap();
        assert_eq!(task.cycles_needed(25), 1);
    }

    #[test]
    fn event_requires_start_before_end() {
        let start = at("2025-08-25T11:00:00+00:00");
        assert!(CalendarEvent::new(start, start, "Standup").is_err());
        assert!(CalendarEvent::new(start, at("2025-08-25T12:00:00+00:00"), "Standup").is_ok());
    }

    #[test]
    fn block_serializes_kind_as_type() {
        let event = CalendarEvent::new(
            at("2025-08-25T11:00:00+00:00"),
            at("2025-08-25T12:00:00+00:00"),
            "Team meeting",
        )
        .unwrap();
        let block = Block::event(&event);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "event");
        assert!(json.get("task_id").is_none());
        assert_eq!(block.duration_minutes(), 60);

        let rest = Block::rest(event.start, event.end, true);
        assert_eq!(serde_json::to_value(&rest).unwrap()["type"], "long_break");
    }
}
