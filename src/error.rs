//! Unified error handling for the speedsync library.
//!
//! The tracking state machine itself never fails: invalid transitions are
//! no-ops and arithmetic edge cases yield zero. Errors only come from the
//! edges of the system (location provider, storage, network, configuration).

use thiserror::Error;

/// Failure reported by the location provider.
///
/// Always non-fatal: tracking continues and the error is surfaced for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    Unavailable,
    #[error("location request timed out")]
    Timeout,
}

/// Unified error type for speedsync operations.
#[derive(Debug, Error)]
pub enum SpeedSyncError {
    /// Location provider error
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    /// Persistence/storage error
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Blob (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error from the database-backed store
    #[cfg(feature = "persistence")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP/API error
    #[error("HTTP error{}: {message}", .status_code.map_or(String::new(), |c| format!(" ({})", c)))]
    Http {
        message: String,
        status_code: Option<u16>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SpeedSyncError {
    pub(crate) fn persistence(message: impl Into<String>) -> Self {
        SpeedSyncError::Persistence {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        SpeedSyncError::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for speedsync operations.
pub type Result<T> = std::result::Result<T, SpeedSyncError>;
