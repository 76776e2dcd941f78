mod config;
pub mod database;
mod entities;
pub mod migrations;

pub use config::{Config, ExportConfig, PomodoroConfig, UiConfig};
pub use database::{Collection, DataResetOptions, DataResetSummary, Database, Record, Repo};
pub use entities::{DocPatch, TaskPatch};
pub use migrations::CURRENT_SCHEMA_VERSION;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the CozyFocus data directory, creating it if needed.
///
/// `COZYFOCUS_DATA_DIR` overrides the location outright. Otherwise the
/// directory is `~/.config/cozyfocus[-dev]/`, with the `-dev` suffix when
/// `COZYFOCUS_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("COZYFOCUS_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("COZYFOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("cozyfocus-dev")
            } else {
                base_dir.join("cozyfocus")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
