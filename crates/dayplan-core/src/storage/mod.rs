mod config;
pub mod database;

pub use config::{CadenceConfig, Config, PlannerConfig, WorkdayConfig};
pub use database::{Database, SessionRecord, StorageStats};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `DAYPLAN_HOME` overrides the location outright; otherwise
/// `~/.config/dayplan[-dev]/` based on DAYPLAN_ENV.
///
/// Set DAYPLAN_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DAYPLAN_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("DAYPLAN_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("dayplan-dev")
            } else {
                base_dir.join("dayplan")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
