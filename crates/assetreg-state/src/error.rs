//! Error types for the asset registry ledger.

use thiserror::Error;

/// Result type alias for ledger operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while encoding keys or touching the ledger.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open ledger: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("invalid key part {part:?}: {reason}")]
    InvalidKeyPart { part: String, reason: &'static str },

    #[error("malformed composite key: {0}")]
    MalformedKey(String),

    #[error("unknown object type: {0}")]
    UnknownObjectType(i32),
}
