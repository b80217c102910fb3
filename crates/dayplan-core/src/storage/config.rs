//! TOML-based application configuration.
//!
//! Stores the user's default planning preferences:
//! - Workday window as local `HH:MM` times plus a UTC offset
//! - Pomodoro cadence (work unit, short/long break, cycles per long break)
//! - Planner settings (padding around calendar events)
//!
//! Configuration is stored at `~/.config/dayplan/config.toml`.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::scheduler::{PlannerOptions, DEFAULT_EVENT_BUFFER_MIN};
use crate::schedule::{
    Cadence, Preferences, DEFAULT_BREAK_MIN, DEFAULT_CYCLES_PER_LONG_BREAK, DEFAULT_LONG_BREAK_MIN,
    DEFAULT_POMODORO_MIN,
};

/// Workday window configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkdayConfig {
    #[serde(default = "default_workday_start")]
    pub start: String, // HH:MM
    #[serde(default = "default_workday_end")]
    pub end: String, // HH:MM
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String, // +HH:MM
}

/// Cadence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default = "default_pomodoro_min")]
    pub pomodoro_min: u32,
    #[serde(default = "default_break_min")]
    pub break_min: u32,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: u32,
    #[serde(default = "default_cycles_per_long_break")]
    pub cycles_per_long_break: u32,
}

/// Planner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_event_buffer_min")]
    pub event_buffer_min: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dayplan/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workday: WorkdayConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

// Default functions
fn default_workday_start() -> String {
    "09:00".into()
}
fn default_workday_end() -> String {
    "17:30".into()
}
fn default_utc_offset() -> String {
    "+00:00".into()
}
fn default_pomodoro_min() -> u32 {
    DEFAULT_POMODORO_MIN
}
fn default_break_min() -> u32 {
    DEFAULT_BREAK_MIN
}
fn default_long_break_min() -> u32 {
    DEFAULT_LONG_BREAK_MIN
}
fn default_cycles_per_long_break() -> u32 {
    DEFAULT_CYCLES_PER_LONG_BREAK
}
fn default_event_buffer_min() -> u32 {
    DEFAULT_EVENT_BUFFER_MIN
}

impl Default for WorkdayConfig {
    fn default() -> Self {
        Self {
            start: default_workday_start(),
            end: default_workday_end(),
            utc_offset: default_utc_offset(),
        }
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            pomodoro_min: default_pomodoro_min(),
            break_min: default_break_min(),
            long_break_min: default_long_break_min(),
            cycles_per_long_break: default_cycles_per_long_break(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            event_buffer_min: default_event_buffer_min(),
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_clock(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| invalid(key, format!("expected HH:MM, got '{value}'")))
}

fn parse_offset(key: &str, value: &str) -> Result<FixedOffset, ConfigError> {
    value
        .parse::<FixedOffset>()
        .map_err(|_| invalid(key, format!("expected +HH:MM, got '{value}'")))
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(key, format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(key, format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid(key, "not a leaf setting"));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn file_path() -> Result<PathBuf, ConfigError> {
        Self::path()
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value in memory. The result is validated as a whole.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check that every value can produce valid preferences.
    ///
    /// # Errors
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let start = parse_clock("workday.start", &self.workday.start)?;
        let end = parse_clock("workday.end", &self.workday.end)?;
        parse_offset("workday.utc_offset", &self.workday.utc_offset)?;
        if start >= end {
            return Err(invalid("workday.end", "must be after workday.start"));
        }
        let cadence = [
            ("cadence.pomodoro_min", self.cadence.pomodoro_min),
            ("cadence.break_min", self.cadence.break_min),
            ("cadence.long_break_min", self.cadence.long_break_min),
            ("cadence.cycles_per_long_break", self.cadence.cycles_per_long_break),
        ];
        for (key, value) in cadence {
            if value == 0 {
                return Err(invalid(key, "must be positive"));
            }
        }
        Ok(())
    }

    pub fn cadence(&self) -> Cadence {
        Cadence {
            pomodoro_min: self.cadence.pomodoro_min,
            break_min: self.cadence.break_min,
            long_break_min: self.cadence.long_break_min,
            cycles_per_long_break: self.cadence.cycles_per_long_break,
        }
    }

    /// The configured UTC offset.
    ///
    /// # Errors
    /// Returns an error if `workday.utc_offset` is not `+HH:MM`.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_offset("workday.utc_offset", &self.workday.utc_offset)
    }

    /// Planner options from the `[planner]` section.
    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            event_buffer_min: self.planner.event_buffer_min,
            start_at: None,
        }
    }

    /// Materialise validated preferences for `date`.
    ///
    /// # Errors
    /// Returns an error if a workday setting is invalid.
    pub fn preferences_for(&self, date: NaiveDate) -> Result<Preferences, ConfigError> {
        self.validate()?;
        let offset = self.utc_offset()?;
        let local = |key: &str, clock: &str| {
            let time = parse_clock(key, clock)?;
            offset
                .from_local_datetime(&date.and_time(time))
                .single()
                .ok_or_else(|| invalid(key, "not representable at this offset"))
        };
        let start = local("workday.start", &self.workday.start)?;
        let end = local("workday.end", &self.workday.end)?;
        Preferences::new(start, end, self.cadence()).map_err(|errors| {
            invalid(
                "workday",
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.cadence.pomodoro_min, 25);
        assert_eq!(parsed.planner.event_buffer_min, 5);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[cadence]\npomodoro_min = 50\n").unwrap();
        assert_eq!(cfg.cadence.pomodoro_min, 50);
        assert_eq!(cfg.cadence.break_min, 5);
        assert_eq!(cfg.workday.start, "09:00");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("workday.start").as_deref(), Some("09:00"));
        assert_eq!(cfg.get("cadence.pomodoro_min").as_deref(), Some("25"));
        assert!(cfg.get("cadence").is_none());
        assert!(cfg.get("cadence.missing_key").is_none());
    }

    #[test]
    fn apply_updates_number_and_string() {
        let mut cfg = Config::default();
        cfg.apply("cadence.long_break_min", "20").unwrap();
        cfg.apply("workday.end", "18:00").unwrap();
        assert_eq!(cfg.cadence.long_break_min, 20);
        assert_eq!(cfg.workday.end, "18:00");
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("cadence.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.apply("cadence.pomodoro_min", "many").is_err());
        assert!(cfg.apply("cadence.pomodoro_min", "0").is_err());
        assert!(cfg.apply("workday.start", "9am").is_err());
        assert!(cfg.apply("workday.end", "08:00").is_err());
        assert!(cfg.apply("cadence", "1").is_err());
        // Nothing half-applied
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn preferences_for_date() {
        let mut cfg = Config::default();
        cfg.apply("workday.utc_offset", "+02:00").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 8, 25).unwrap();
        let prefs = cfg.preferences_for(date).unwrap();
        assert_eq!(prefs.workday_start.hour(), 9);
        assert_eq!(prefs.workday_start.offset().local_minus_utc(), 7200);
        assert_eq!(prefs.workday_minutes(), 510);
        assert_eq!(prefs.cadence, Cadence::default());
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.apply("planner.event_buffer_min", "0").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().planner.event_buffer_min, 0);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cadence]\nbreak_min = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
