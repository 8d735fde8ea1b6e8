use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraderError>;

#[derive(Error, Debug)]
pub enum GraderError {
    /// Invalid distribution, maxima, cohort layout or option combination.
    /// Aborts the run before any winner is selected.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sheet row that cannot be turned into a score.
    #[error("malformed record in {} line {line}: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// A score that would poison the aggregate (NaN, infinite or negative).
    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GraderError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn malformed(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
