//! Error types for the zsctl CLI tool
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// Main error type for the zsctl application
#[derive(Error, Debug)]
pub enum ZsctlError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors related to process table sampling
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Errors related to systemd unit queries and mutations
    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),

    /// Errors raised while reconciling current vs. desired status
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Errors related to the ZScaler notification log
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file is missing entirely. Recovered at the top level and
    /// reported as a plain message rather than propagated further.
    #[error("configuration file does not exist: {path}")]
    NotFound { path: String },

    #[error("failed to parse configuration file {path}: {message}")]
    ParseFailed { path: String, message: String },

    #[error("invalid configuration value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Process table sampling errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to run {command}: {message}")]
    CommandFailed { command: String, message: String },

    /// A `ps aux` row did not have the expected column shape. Indicates an
    /// incompatible procps version and must not be retried.
    #[error("unexpected ps output row: {row:?}")]
    MalformedPsRow { row: String },
}

/// Systemd unit query/mutation errors
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("failed to run systemctl for unit {unit}: {message}")]
    CommandFailed { unit: String, message: String },

    /// The `systemctl status` output did not carry the expected `Loaded:`
    /// marker line. Indicates an incompatible systemd version and must not
    /// be retried.
    #[error(
        "expected the second line of `systemctl status {unit}` to start with 'Loaded: ', got:\n\n{output}"
    )]
    UnexpectedStatusOutput { unit: String, output: String },
}

/// Reconciliation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The requested (current, desired) pair has no valid action. Caller
    /// error: a mixed status is only ever observed, never targeted.
    #[error("unable to determine the action to take:\ncurrent: {current}\ndesired: {desired}")]
    UnsupportedTransition { current: String, desired: String },

    /// A startup/shutdown step failed its verification. The whole sequence
    /// aborts at the first occurrence.
    #[error("failed to {step}")]
    StepFailed { step: String },
}

/// ZScaler notification log errors
#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("failed to query ZScaler DB: {message}")]
    QueryFailed { message: String },

    #[error("failed to parse event timestamp {time:?}: {message}")]
    BadTimestamp { time: String, message: String },

    /// The latest event carries a name outside the known mapping table.
    /// Guessing would hide a third-party behavior change, so this is fatal.
    #[error("unsupported notification name: {name:?}")]
    UnrecognizedEvent { name: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ZsctlError>;
