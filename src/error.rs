//! Error types for benchmark report generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the report pipeline.
///
/// Per-artifact and per-interval variants are recovered by the caller (the
/// artifact or row is skipped). `EmptyResultSet` is the only condition that
/// aborts a report.
#[derive(Error, Debug)]
pub enum Error {
    /// Artifact is malformed or lacks a required field
    #[error("Artifact parse error: {}: {message}", path.display())]
    ArtifactParse { path: PathBuf, message: String },

    /// Two consecutive samples are not strictly increasing in time
    #[error(
        "Degenerate interval between samples at {previous}ns and {current}ns (interval must be positive)"
    )]
    DegenerateInterval { previous: u64, current: u64 },

    /// A sample lacks one of the cumulative CPU counters
    #[error("Missing counter '{counter}' for host '{host}' at {timestamp}ns")]
    MissingCounter {
        timestamp: u64,
        host: String,
        counter: String,
    },

    /// Nothing to report on
    #[error("No data: {0}")]
    EmptyResultSet(String),

    /// Named statistic unavailable in the winning artifact's last sample
    #[error("Statistic '{statistic}' not available in {}", path.display())]
    MissingSecondaryStatistic { path: PathBuf, statistic: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] Box<serde_json::Error>),
}

impl Error {
    /// Create an artifact parse error.
    pub fn artifact_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArtifactParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an empty-result-set error.
    pub fn empty_result_set(message: impl Into<String>) -> Self {
        Self::EmptyResultSet(message.into())
    }

    /// Create a missing-secondary-statistic error.
    pub fn missing_statistic(path: impl Into<PathBuf>, statistic: impl Into<String>) -> Self {
        Self::MissingSecondaryStatistic {
            path: path.into(),
            statistic: statistic.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error only invalidates a single artifact, row or cell.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ArtifactParse { .. }
                | Self::DegenerateInterval { .. }
                | Self::MissingCounter { .. }
                | Self::MissingSecondaryStatistic { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Box::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Box::new(value))
    }
}
