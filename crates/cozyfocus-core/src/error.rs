//! Core error types for cozyfocus-core.
//!
//! Validation problems with an import bundle, storage failures and
//! configuration issues each get their own enum; `CoreError` ties them
//! together for callers that just want to propagate with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cozyfocus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Import bundle could not be accepted
    #[error("Import error: {0}")]
    Bundle(#[from] BundleError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored document no longer deserializes into its record type
    #[error("Corrupt record '{key}' in {collection}: {message}")]
    CorruptRecord {
        collection: &'static str,
        key: String,
        message: String,
    },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Reasons an export bundle is rejected before anything is written.
#[derive(Error, Debug)]
pub enum BundleError {
    /// Payload is not JSON at all
    #[error("not a recognized CozyFocus export: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Payload is JSON but not an object
    #[error("not a recognized CozyFocus export: top-level value must be an object")]
    NotAnObject,

    /// The `app` tag is missing or belongs to another application
    #[error("not a recognized CozyFocus export: app tag is {}", .found.as_deref().unwrap_or("missing"))]
    ForeignApp { found: Option<String> },

    /// The `data` section is absent or not an object
    #[error("not a recognized CozyFocus export: missing data section")]
    MissingData,

    /// A collection inside `data` is present but not an array
    #[error("not a recognized CozyFocus export: '{0}' must be an array")]
    InvalidCollection(&'static str),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Day key is not `YYYY-MM-DD`
    #[error("Invalid day key '{0}': expected YYYY-MM-DD")]
    InvalidDayKey(String),

    /// Record not found
    #[error("{collection} '{id}' not found")]
    NotFound { collection: &'static str, id: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy
                {
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
    fn foreign_app_message_names_the_tag() {
        let err = BundleError::ForeignApp {
            found: Some("OtherApp".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "not a recognized CozyFocus export: app tag is OtherApp"
        );

        let missing = BundleError::ForeignApp { found: None };
        assert!(missing.to_string().ends_with("app tag is missing"));
    }

    #[test]
    fn busy_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }
}
