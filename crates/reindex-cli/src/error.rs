//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the user with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// Loading the schema or fixture failed.
    #[error(transparent)]
    Core(#[from] reindex_core::Error),

    /// The requested entity type is not declared in the schema.
    #[error("unknown entity type: {0}")]
    UnknownType(String),

    /// The walk task panicked or was cancelled.
    #[error("walk task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
