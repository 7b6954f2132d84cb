//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while loading a dataset
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unknown dataset: {0}")]
    DatasetNotFound(String),

    #[error("Dataset {dataset} is unreadable: {reason}")]
    DatasetUnreadable { dataset: String, reason: String },
}

/// Errors that can occur while filtering, grouping or reducing a table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Reduction over column {column} has no values to work with")]
    EmptyGroup { column: String },

    #[error("Column {0} is not a date column")]
    InvalidDateColumn(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Column {column} must be {expected}")]
    TypeMismatch { column: String, expected: &'static str },
}

/// Errors that can occur while preparing a chart description
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Label sequences differ in length (actual: {actual}, predicted: {predicted})")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("No input rows")]
    EmptyInput,

    #[error("All labels belong to a single class; ROC curve is undefined")]
    SingleClass,

    #[error("Need at least two numeric columns, found {found}")]
    InsufficientColumns { found: usize },

    #[error(transparent)]
    Aggregate(AggregateError),
}

/// Errors raised by a page controller for a single panel
#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("Unknown page: {0}")]
    UnknownPage(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while loading the dashboard configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<AggregateError> for ChartError {
    fn from(err: AggregateError) -> Self {
        // Column-level problems keep their chart-facing name
        match err {
            AggregateError::MissingColumn(col) => ChartError::MissingColumn(col),
            AggregateError::InvalidOption(msg) => ChartError::InvalidOption(msg),
            other => ChartError::Aggregate(other),
        }
    }
}
