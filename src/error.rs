// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = BurstError> = std::result::Result<T, E>;

/// Failures raised while loading configuration or reducing a single export.
///
/// Everything except `Config` is scoped to one input file; the binary logs it
/// and moves on to the next file.
#[derive(Debug, Error)]
pub enum BurstError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("unsupported input type: {}", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// The date-header literal never appears in column 0.
    #[error("header row labelled {literal:?} not found in column 0")]
    HeaderNotFound { literal: String },

    #[error("column {name:?} is not present in the header row")]
    MissingColumn { name: String },

    /// One data row whose date and time cells do not combine into a timestamp.
    #[error("row {row}: cannot build a timestamp from date {date:?} and time {time:?}")]
    TimestampParse {
        row: usize,
        date: String,
        time: String,
    },

    #[error("no data rows with a usable timestamp")]
    NoDataRows,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
