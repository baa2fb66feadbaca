//! Error taxonomy for registry invocations.

use std::fmt;

use assetreg_state::StateError;
use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// The two persisted entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Descriptor,
    Bundle,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Descriptor => f.write_str("AppDescriptor"),
            EntityKind::Bundle => f.write_str("AppBundle"),
        }
    }
}

/// Everything an invocation can fail with. Errors reach the caller
/// unchanged; the host decides whether to retry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invoke called with no arguments")]
    EmptyInvocation,

    #[error("invalid invocation function: {0}")]
    UnknownCommand(String),

    #[error("wrong number of arguments to {command}: expected {expected}, got {actual}")]
    ArgumentCount {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} not found for key {key}")]
    NotFound { kind: EntityKind, key: String },

    #[error("cannot create an {kind} whose key already exists: {key}")]
    AlreadyExists { kind: EntityKind, key: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot unmarshal {record}: {source}")]
    Serialization {
        record: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("ledger error: {0}")]
    Store(StateError),
}

impl From<StateError> for RegistryError {
    fn from(err: StateError) -> Self {
        match err {
            // A key part the codec refuses is bad caller input.
            StateError::InvalidKeyPart { .. } => RegistryError::Validation(err.to_string()),
            other => RegistryError::Store(other),
        }
    }
}
