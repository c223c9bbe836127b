//! Shared error types for the services crate.

use thiserror::Error;

use progress_core::model::DocumentError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ActivityService`.
///
/// Every variant is recoverable: the stored document is left as it was
/// before the failing call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActivityError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored activity document is unreadable: {0}")]
    Document(#[from] DocumentError),
    #[error("activity document could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reasons an import was refused.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("import is not valid JSON: {0}")]
    Parse(serde_json::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
}
