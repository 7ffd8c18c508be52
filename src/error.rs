// Error taxonomy for a sweep run

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while enumerating, extracting and storing.
///
/// `Enumeration`, `StoreInit`, `Config` and `Store` abort the run.
/// `Extractor` and `MalformedOffset` are reported and absorbed by the driver.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("cannot enumerate {}: {reason}", root.display())]
    Enumeration { root: PathBuf, reason: String },

    #[error("cannot create store at {}: {reason}", path.display())]
    StoreInit { path: PathBuf, reason: String },

    #[error("extractor failed on {} at index {index}: {failure}", path.display())]
    Extractor {
        path: PathBuf,
        index: u32,
        failure: crate::extractor::ExtractorFailure,
    },

    #[error("malformed offset line {line:?}")]
    MalformedOffset { line: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store write failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type Result<T> = std::result::Result<T, SweepError>;
