//! Load-time and backend error taxonomy.
//!
//! Schema and load errors are fatal: they abort startup before any session
//! begins, so a registry is never half-built. Backend errors are recoverable
//! at the turn level. Per-call failures live in [`crate::types::CallErrorKind`]
//! because they travel inside the conversation, not up the call stack.

use thiserror::Error;

/// Failure to derive a tool specification from a method declaration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error(
        "tool {toolkit}.{method}: parameter '{parameter}' has unsupported declared type '{declared}'"
    )]
    UnsupportedType {
        toolkit: String,
        method: String,
        parameter: String,
        declared: String,
    },
}

/// Failure while loading toolkits and building the registry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("duplicate tool name '{name}' (defined by both {first} and {second})")]
    DuplicateTool {
        name: String,
        first: String,
        second: String,
    },

    #[error("failed to construct toolkit '{toolkit}': {reason}")]
    Construction { toolkit: String, reason: String },

    #[error("unknown toolkit '{0}' in tool sources")]
    UnknownToolkit(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Failure talking to the model backend. Surfaced to the user; the
/// session stays open for retry.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Network(String),

    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),
}
