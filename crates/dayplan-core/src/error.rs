//! Core error types for dayplan-core.
//!
//! Input problems are reported as [`ValidationError`]s before any planning
//! runs. Once a request is validated the planner itself cannot fail, so the
//! remaining variants only cover the collaborators around it (config files,
//! session history, timer sessions).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dayplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A single field failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A whole request failed validation; one entry per offending field
    #[error("Invalid request: {}", format_field_errors(.0))]
    InvalidRequest(Vec<ValidationError>),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session history errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Timer session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

fn format_field_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Field-level validation errors.
///
/// Every variant carries the path of the offending field, e.g.
/// `tasks[2].priority` or `preferences.workday_start`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Timestamp parsed but carries no UTC offset
    #[error("'{field}' must carry an explicit UTC offset, got '{value}'")]
    NaiveTimestamp { field: String, value: String },

    /// Timestamp could not be parsed at all
    #[error("'{field}' is not an ISO-8601 timestamp: '{value}'")]
    MalformedTimestamp { field: String, value: String },

    /// Duration that must be a positive number of minutes
    #[error("'{field}' must be a positive number of minutes, got {value}")]
    NonPositiveDuration { field: String, value: i64 },

    /// Invalid time range
    #[error("Invalid time range for '{field}': end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        field: String,
        start: String,
        end: String,
    },

    /// Priority outside 1..=5
    #[error("'{field}' must be between 1 and 5, got {value}")]
    PriorityOutOfRange { field: String, value: i64 },

    /// Empty or whitespace-only title
    #[error("'{field}' must not be empty")]
    EmptyTitle { field: String },

    /// Two tasks share one id
    #[error("'{field}' duplicates task id '{id}'")]
    DuplicateTaskId { field: String, id: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Path of the field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            Self::NaiveTimestamp { field, .. }
            | Self::MalformedTimestamp { field, .. }
            | Self::NonPositiveDuration { field, .. }
            | Self::InvalidTimeRange { field, .. }
            | Self::PriorityOutOfRange { field, .. }
            | Self::EmptyTitle { field }
            | Self::DuplicateTaskId { field, .. }
            | Self::InvalidValue { field, .. } => field,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Session history errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Timer session errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session registered under this id
    #[error("No timer session '{0}'")]
    NotFound(String),

    /// Session is already counting down
    #[error("Timer session '{0}' is already running")]
    AlreadyRunning(String),

    /// Session was created without blocks
    #[error("Timer session has no blocks to run")]
    EmptyPlan,

    /// Start index past the end of the block list
    #[error("Start index {index} out of bounds for {len} blocks")]
    StartOutOfBounds { index: usize, len: usize },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_lists_every_field() {
        let err = CoreError::InvalidRequest(vec![
            ValidationError::EmptyTitle {
                field: "tasks[0].title".into(),
            },
            ValidationError::PriorityOutOfRange {
                field: "tasks[1].priority".into(),
                value: 9,
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("tasks[0].title"));
        assert!(message.contains("tasks[1].priority"));
    }

    #[test]
    fn field_accessor_returns_path() {
        let err = ValidationError::NaiveTimestamp {
            field: "events[0].start".into(),
            value: "2025-08-25T11:00:00".into(),
        };
        assert_eq!(err.field(), "events[0].start");
    }
}
