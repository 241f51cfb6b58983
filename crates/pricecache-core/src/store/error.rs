use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure of the local price cache.
///
/// Storage errors are never swallowed: a broken cache is surfaced to whoever
/// asked for the read or write. Sources are behind `Arc` so one failure can be
/// handed to every caller sharing a refresh.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Failed to {action} cache file {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Failed to parse cache file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("Failed to serialize price table: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),

    #[error("Unsupported cache schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("Cache task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.into(),
            source: Arc::new(err),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}
