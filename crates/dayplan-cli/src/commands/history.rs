use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use dayplan_core::storage::Database;
use dayplan_core::Config;

use super::CliResult;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Sessions recorded today
    Today,
    /// Sessions recorded on a date (YYYY-MM-DD)
    On {
        date: NaiveDate,
    },
    /// All-time totals
    Stats,
    /// Delete sessions older than N days
    Cleanup {
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

pub fn run(action: HistoryAction) -> CliResult {
    let db = Database::open()?;

    match action {
        HistoryAction::Today => {
            let offset = Config::load_or_default().utc_offset()?;
            let sessions = db.sessions_on(Utc::now().with_timezone(&offset).date_naive())?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::On { date } => {
            let sessions = db.sessions_on(date)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::Stats => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        HistoryAction::Cleanup { days } => {
            let removed = db.cleanup_older_than(days)?;
            println!("removed {removed} sessions");
        }
    }
    Ok(())
}
