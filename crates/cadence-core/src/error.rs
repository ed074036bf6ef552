//! Core error types for cadence-core.
//!
//! Only two classes of failure exist in the analytics pipeline:
//! - **Fatal**: calendar enumeration fails, no calendar is available for a
//!   write, or a create-event call fails mid-batch. These abort the call.
//! - **Degraded**: a single calendar's event fetch fails. That calendar is
//!   treated as empty and the failure is only logged.
//!
//! Scoring and pattern derivation never fail; missing data degrades to a
//! documented neutral value instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cadence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Listing the calendars of an identity failed.
    #[error("failed to list calendars for '{identity}': {source}")]
    CalendarEnumeration {
        identity: String,
        #[source]
        source: DataSourceError,
    },

    /// A write was requested but the identity has no calendar.
    #[error("no calendars found for '{identity}'")]
    NoCalendars { identity: String },

    /// A single event could not be loaded.
    #[error("failed to fetch event '{event_id}': {source}")]
    EventLookup {
        event_id: String,
        #[source]
        source: DataSourceError,
    },

    /// Creating one focus block of a batch failed.
    ///
    /// Blocks created before the failure are NOT rolled back; their calendar
    /// event ids are listed in `created_event_ids`.
    #[error(
        "failed to create focus block {index} of {total} ({} already created): {source}",
        .created_event_ids.len()
    )]
    ProtectedBlockCreation {
        index: usize,
        total: usize,
        created_event_ids: Vec<String>,
        #[source]
        source: DataSourceError,
    },

    /// There is no meeting history to base a recommendation on.
    #[error("not enough historical data for duration optimization")]
    InsufficientHistory,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors reported by a [`CalendarDataSource`](crate::calendar::CalendarDataSource)
/// implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// The requested calendar or event does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// The provider could not be reached or timed out.
    #[error("calendar provider unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request.
    #[error("request rejected by calendar provider: {0}")]
    Rejected(String),
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end_time ({end}) must be greater than start_time ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Malformed `HH:MM` clock time
    #[error("Invalid clock time '{0}': expected HH:MM")]
    InvalidClockTime(String),

    /// Unknown weekday name
    #[error("Invalid day of week '{0}'")]
    InvalidDayOfWeek(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
