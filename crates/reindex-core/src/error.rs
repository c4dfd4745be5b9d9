//! Error types.

use thiserror::Error;

use crate::key::EntityKey;

/// Failures raised by the relational store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Session could not be opened or has been closed.
    #[error("session error: {0}")]
    Session(String),

    /// Pending writes could not be flushed.
    #[error("flush failed: {0}")]
    Flush(String),

    /// No persisted row for the requested entity.
    #[error("entity not found: {0}")]
    NotFound(EntityKey),

    /// A dependents query could not be executed.
    #[error("query failed: {0}")]
    Query(String),
}

/// Failures raised by the full-text index sink.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The sink refused the document.
    #[error("index rejected {key}: {reason}")]
    Rejected {
        /// Entity whose document was refused.
        key: EntityKey,
        /// Reason reported by the sink.
        reason: String,
    },

    /// The index backend failed.
    #[error("index backend error: {0}")]
    Backend(String),
}

/// Crate-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Store collaborator error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Index collaborator error.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Schema declaration could not be loaded.
    #[error("schema error: {0}")]
    Schema(String),

    /// Dispatcher is unavailable.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
