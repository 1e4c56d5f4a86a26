//! Core error types for skillforge-core.
//!
//! Only [`TransitionError`] is ever returned from the engine's public
//! `start`/`pause`/`resume`/`stop` boundary. Storage and settings failures are
//! logged and absorbed by the engine; they surface here for the storage and
//! configuration APIs used directly by callers.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerStatus;

/// Core error type for skillforge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A state-machine method was called from a state that forbids it
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Settings could not be read
    #[error(transparent)]
    Settings(#[from] SettingsError),

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

/// Database-specific errors. Every variant is a `PersistenceFailure` from the
/// engine's point of view.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The data directory could not be created
    #[error("Failed to prepare data directory: {0}")]
    DataDir(#[source] std::io::Error),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// A referenced skill, task or session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A foreign-key, unique or check constraint rejected the write
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The disk or file system failed underneath SQLite
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl DatabaseError {
    /// Whether repeating the same call later may succeed.
    ///
    /// Missing rows, constraint violations and bad data fail the same way
    /// every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Locked
                | DatabaseError::Unavailable(_)
                | DatabaseError::OpenFailed { .. }
                | DatabaseError::DataDir(_)
        )
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// A caller invoked a timer operation from a state that forbids it.
///
/// Indicates a caller bug; never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid transition: cannot {action} while {from}")]
pub struct TransitionError {
    pub action: &'static str,
    pub from: TimerStatus,
}

impl TransitionError {
    pub fn new(action: &'static str, from: TimerStatus) -> Self {
        Self { action, from }
    }
}

/// The settings provider could not answer; callers fall back to defaults.
#[derive(Error, Debug, Clone)]
pub enum SettingsError {
    #[error("settings unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => match code.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation => DatabaseError::Constraint(err.to_string()),
                rusqlite::ErrorCode::SystemIoFailure
                | rusqlite::ErrorCode::DiskFull
                | rusqlite::ErrorCode::CannotOpen => DatabaseError::Unavailable(err.to_string()),
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Corrupt(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
