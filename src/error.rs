//! Error handling for kryptopit
//!
//! File-fatal import failures and per-row parse causes are typed with
//! thiserror; application plumbing uses anyhow for context chaining.

use thiserror::Error;

/// Failures that abort ingestion of a single file
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("file too large: {size} bytes exceeds the limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("could not decode file contents as text")]
    Encoding,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single row was dropped; rendered into a batch warning
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid date: '{0}'")]
    InvalidDate(String),

    #[error("invalid number in {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

/// Result type alias for application operations
pub type Result<T> = anyhow::Result<T>;
