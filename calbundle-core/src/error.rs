//! Error types for the ingestion pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting a calendar store.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read metadata {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },

    #[error("ICS parse error in {}: {message}", path.display())]
    IcsParse { path: PathBuf, message: String },

    #[error("Store error: {0}")]
    Store(#[from] tokio_rusqlite::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("{failed} calendar(s) failed to ingest; first failure in {}: {first}", path.display())]
    CalendarsFailed {
        failed: usize,
        path: PathBuf,
        first: Box<IngestError>,
    },
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;
