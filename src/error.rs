//! Error types for pcmatch

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("no usable postcode rows: the reference set is empty")]
    EmptyReferenceSet,

    #[error("internal error: {properties} properties but {matches} match results")]
    CardinalityMismatch { properties: usize, matches: usize },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV failure on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no {column} column (headers: {headers})", path.display())]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
        headers: String,
    },

    #[error("{} is missing columns: {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MatchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MatchError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        MatchError::Csv {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for MatchError {
    fn from(e: toml::de::Error) -> Self {
        MatchError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
