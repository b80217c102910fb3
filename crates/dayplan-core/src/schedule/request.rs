//! Wire format of a planning request and its validation.
//!
//! Timestamps arrive as strings so that a missing UTC offset is reported as a
//! field error instead of a generic deserialization failure.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::timestamp::parse_timestamp;
use super::{
    Block, CalendarEvent, Cadence, EnergyLevel, Preferences, Task, DEFAULT_BREAK_MIN,
    DEFAULT_CYCLES_PER_LONG_BREAK, DEFAULT_LONG_BREAK_MIN, DEFAULT_POMODORO_MIN, DEFAULT_PRIORITY,
};
use crate::error::{CoreError, Result, ValidationError};
use crate::summary::PlanSummary;

/// Preferences as they appear in a request file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesInput {
    pub workday_start: String,
    pub workday_end: String,
    #[serde(default = "default_pomodoro_min")]
    pub pomodoro_min: i64,
    #[serde(default = "default_break_min")]
    pub break_min: i64,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: i64,
    #[serde(default = "default_cycles_per_long_break")]
    pub cycles_per_long_break: i64,
}

/// Task as it appears in a request file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub estimate_min: i64,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub energy: Option<EnergyLevel>,
    #[serde(default)]
    pub requires_deep_work: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Calendar event as it appears in a request file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventInput {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Unvalidated planning request.
///
/// `preferences` may be omitted; [`PlanRequestInput::validate`] then falls
/// back to the caller-supplied defaults (normally the user's config).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequestInput {
    #[serde(default)]
    pub preferences: Option<PreferencesInput>,
    #[serde(default)]
    pub tasks: Vec<TaskInput>,
    #[serde(default)]
    pub events: Vec<EventInput>,
}

/// A validated planning request. Read-only input to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub preferences: Preferences,
    pub tasks: Vec<Task>,
    pub events: Vec<CalendarEvent>,
}

/// Planner output: chronologically sorted blocks plus their summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub blocks: Vec<Block>,
    pub summary: PlanSummary,
}

fn default_pomodoro_min() -> i64 {
    i64::from(DEFAULT_POMODORO_MIN)
}
fn default_break_min() -> i64 {
    i64::from(DEFAULT_BREAK_MIN)
}
fn default_long_break_min() -> i64 {
    i64::from(DEFAULT_LONG_BREAK_MIN)
}
fn default_cycles_per_long_break() -> i64 {
    i64::from(DEFAULT_CYCLES_PER_LONG_BREAK)
}

fn positive_minutes(field: String, value: i64, errors: &mut Vec<ValidationError>) -> u32 {
    match u32::try_from(value) {
        Ok(v) if v > 0 => v,
        _ => {
            errors.push(ValidationError::NonPositiveDuration { field, value });
            0
        }
    }
}

fn non_empty_title(field: String, title: &str, errors: &mut Vec<ValidationError>) {
    if title.trim().is_empty() {
        errors.push(ValidationError::EmptyTitle { field });
    }
}

impl PreferencesInput {
    fn validate(&self, prefix: &str, errors: &mut Vec<ValidationError>) -> Option<Preferences> {
        let before = errors.len();
        let start = parse_timestamp(&format!("{prefix}workday_start"), &self.workday_start)
            .map_err(|e| errors.push(e))
            .ok();
        let end = parse_timestamp(&format!("{prefix}workday_end"), &self.workday_end)
            .map_err(|e| errors.push(e))
            .ok();
        let cadence = Cadence {
            pomodoro_min: positive_minutes(format!("{prefix}pomodoro_min"), self.pomodoro_min, errors),
            break_min: positive_minutes(format!("{prefix}break_min"), self.break_min, errors),
            long_break_min: positive_minutes(
                format!("{prefix}long_break_min"),
                self.long_break_min,
                errors,
            ),
            cycles_per_long_break: positive_minutes(
                format!("{prefix}cycles_per_long_break"),
                self.cycles_per_long_break,
                errors,
            ),
        };
        let (start, end) = (start?, end?);
        Preferences::check_window(&start, &end, prefix, errors);
        (errors.len() == before).then_some(Preferences {
            workday_start: start,
            workday_end: end,
            cadence,
        })
    }
}

impl TaskInput {
    fn validate(&self, index: usize, errors: &mut Vec<ValidationError>) -> Option<Task> {
        let before = errors.len();
        let prefix = format!("tasks[{index}].");
        non_empty_title(format!("{prefix}title"), &self.title, errors);
        let estimate_min = positive_minutes(format!("{prefix}estimate_min"), self.estimate_min, errors);

        let priority = self.priority.unwrap_or(i64::from(DEFAULT_PRIORITY));
        if !(1..=5).contains(&priority) {
            errors.push(ValidationError::PriorityOutOfRange {
                field: format!("{prefix}priority"),
                value: priority,
            });
        }

        let deadline = match &self.deadline {
            Some(raw) => match parse_timestamp(&format!("{prefix}deadline"), raw) {
                Ok(dt) => Some(dt),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
            None => None,
        };

        if errors.len() != before {
            return None;
        }

        Some(Task {
            id: self
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title: self.title.clone(),
            estimate_min,
            priority: priority as u8,
            deadline,
            energy: self.energy.unwrap_or_default(),
            requires_deep_work: self.requires_deep_work,
            notes: self.notes.clone(),
        })
    }
}

impl EventInput {
    fn validate(&self, index: usize, errors: &mut Vec<ValidationError>) -> Option<CalendarEvent> {
        let before = errors.len();
        let prefix = format!("events[{index}].");
        non_empty_title(format!("{prefix}title"), &self.title, errors);
        let start = parse_timestamp(&format!("{prefix}start"), &self.start)
            .map_err(|e| errors.push(e))
            .ok();
        let end = parse_timestamp(&format!("{prefix}end"), &self.end)
            .map_err(|e| errors.push(e))
            .ok();
        let (start, end) = (start?, end?);
        if start >= end {
            errors.push(ValidationError::InvalidTimeRange {
                field: format!("{prefix}end"),
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        (errors.len() == before).then(|| CalendarEvent {
            start,
            end,
            title: self.title.clone(),
            location: self.location.clone(),
        })
    }
}

impl PlanRequestInput {
    /// Parse a request from JSON text without validating it.
    ///
    /// # Errors
    /// Returns [`CoreError::Json`] for structurally invalid JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate every field, collecting one error per offending field.
    ///
    /// `fallback` is used when the request carries no preferences.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidRequest`] listing all field errors.
    pub fn validate(&self, fallback: Option<&Preferences>) -> Result<PlanRequest> {
        let mut errors = Vec::new();

        let preferences = match (&self.preferences, fallback) {
            (Some(input), _) => input.validate("preferences.", &mut errors),
            (None, Some(prefs)) => Some(prefs.clone()),
            (None, None) => {
                errors.push(ValidationError::InvalidValue {
                    field: "preferences".into(),
                    message: "missing and no defaults available".into(),
                });
                None
            }
        };

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for (i, input) in self.tasks.iter().enumerate() {
            if let Some(task) = input.validate(i, &mut errors) {
                if !seen.insert(task.id.clone()) {
                    errors.push(ValidationError::DuplicateTaskId {
                        field: format!("tasks[{i}].id"),
                        id: task.id.clone(),
                    });
                    continue;
                }
                tasks.push(task);
            }
        }

        let events: Vec<_> = self
            .events
            .iter()
            .enumerate()
            .filter_map(|(i, input)| input.validate(i, &mut errors))
            .collect();

        match preferences {
            Some(preferences) if errors.is_empty() => Ok(PlanRequest {
                preferences,
                tasks,
                events,
            }),
            _ => Err(CoreError::InvalidRequest(errors)),
        }
    }
}

impl PlanRequest {
    /// Parse and validate a request from JSON text.
    ///
    /// # Errors
    /// Returns [`CoreError::Json`] for malformed JSON and
    /// [`CoreError::InvalidRequest`] for field errors.
    pub fn from_json(json: &str, fallback: Option<&Preferences>) -> Result<Self> {
        PlanRequestInput::from_json(json)?.validate(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "preferences": {
            "workday_start": "2025-08-25T09:00:00+00:00",
            "workday_end": "2025-08-25T17:30:00+00:00",
            "pomodoro_min": 25,
            "break_min": 5
        },
        "tasks": [
            {"id": "task-1", "title": "Write report", "estimate_min": 50, "priority": 5,
             "deadline": "2025-08-27T23:59:00+00:00", "requires_deep_work": true},
            {"title": "Inbox", "estimate_min": 20}
        ],
        "events": [
            {"start": "2025-08-25T11:00:00+00:00", "end": "2025-08-25T12:00:00+00:00",
             "title": "Team meeting", "location": "Zoom"}
        ]
    }"#;

    fn field_errors(json: &str) -> Vec<ValidationError> {
        match PlanRequest::from_json(json, None) {
            Err(CoreError::InvalidRequest(errors)) => errors,
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn valid_request_applies_defaults() {
        let request = PlanRequest::from_json(VALID, None).unwrap();
        assert_eq!(request.preferences.cadence.long_break_min, 15);
        assert_eq!(request.preferences.cadence.cycles_per_long_break, 4);
        assert_eq!(request.tasks.len(), 2);
        assert_eq!(request.tasks[1].priority, 3);
        assert_eq!(request.tasks[1].energy, EnergyLevel::Light);
        assert!(!request.tasks[1].id.is_empty());
        assert_eq!(request.events[0].location.as_deref(), Some("Zoom"));
    }

    #[test]
    fn naive_timestamps_are_rejected_per_field() {
        let json = r#"{
            "preferences": {"workday_start": "2025-08-25T09:00:00", "workday_end": "2025-08-25T17:00:00+00:00"},
            "events": [{"start": "2025-08-25T11:00:00", "end": "2025-08-25T12:00:00", "title": "x"}]
        }"#;
        let errors = field_errors(json);
        let fields: Vec<_> = errors.iter().map(|e| e.field().to_string()).collect();
        assert_eq!(
            fields,
            vec!["preferences.workday_start", "events[0].start", "events[0].end"]
        );
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::NaiveTimestamp { .. })));
    }

    #[test]
    fn every_bad_task_field_is_reported() {
        let json = r#"{
            "preferences": {"workday_start": "2025-08-25T09:00:00+00:00", "workday_end": "2025-08-25T17:00:00+00:00"},
            "tasks": [{"title": "", "estimate_min": 0, "priority": 7}]
        }"#;
        let fields: Vec<_> = field_errors(json)
            .iter()
            .map(|e| e.field().to_string())
            .collect();
        assert_eq!(
            fields,
            vec!["tasks[0].title", "tasks[0].estimate_min", "tasks[0].priority"]
        );
    }

    #[test]
    fn inverted_window_and_event_are_rejected() {
        let json = r#"{
            "preferences": {"workday_start": "2025-08-25T17:00:00+00:00", "workday_end": "2025-08-25T09:00:00+00:00",
                            "break_min": 0},
            "events": [{"start": "2025-08-25T12:00:00+00:00", "end": "2025-08-25T11:00:00+00:00", "title": "x"}]
        }"#;
        let fields: Vec<_> = field_errors(json)
            .iter()
            .map(|e| e.field().to_string())
            .collect();
        assert_eq!(
            fields,
            vec!["preferences.break_min", "preferences.workday_end", "events[0].end"]
        );
    }

    #[test]
    fn duplicate_task_ids_are_rejected() {
        let json = r#"{
            "preferences": {"workday_start": "2025-08-25T09:00:00+00:00", "workday_end": "2025-08-25T17:00:00+00:00"},
            "tasks": [{"id": "a", "title": "one", "estimate_min": 10},
                      {"id": "a", "title": "two", "estimate_min": 10}]
        }"#;
        let errors = field_errors(json);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::DuplicateTaskId { .. }));
    }

    #[test]
    fn missing_preferences_use_fallback() {
        let fallback = PlanRequest::from_json(VALID, None).unwrap().preferences;
        let request = PlanRequest::from_json(r#"{"tasks": []}"#, Some(&fallback)).unwrap();
        assert_eq!(request.preferences, fallback);

        let errors = field_errors(r#"{"tasks": []}"#);
        assert_eq!(errors[0].field(), "preferences");
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(
            PlanRequest::from_json("{not json", None),
            Err(CoreError::Json(_))
        ));
    }
}
