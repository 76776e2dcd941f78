use clap::Subcommand;
use cozyfocus_core::accounting::{sessions_for_day, stats_for_day, stats_range};
use cozyfocus_core::parse_day_key;
use cozyfocus_core::storage::Database;

use super::resolve_day;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// Stats and sessions of one day
    Day {
        /// Day (YYYY-MM-DD)
        day: String,
    },
    /// Totals across a range of days (inclusive)
    Range {
        from: String,
        to: String,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today => {
            let day = resolve_day(None)?;
            let stats = stats_for_day(&db, &day)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Day { day } => {
            let day = resolve_day(Some(day))?;
            let report = serde_json::json!({
                "stats": stats_for_day(&db, &day)?,
                "sessions": sessions_for_day(&db, &day)?,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatsAction::Range { from, to } => {
            if parse_day_key(&from)? > parse_day_key(&to)? {
                return Err(format!("range start {from} is after end {to}").into());
            }
            let summary = stats_range(&db, &from, &to)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
