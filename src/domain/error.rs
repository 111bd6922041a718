//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors abort the triggering grid operation; they are never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("no context object for new row{}", context_suffix(.context))]
    NoContextObject { context: Option<String> },

    #[error("context object not unique: {context} is displayed in {count} rows")]
    ContextNotUnique { context: String, count: usize },

    #[error("position context {context} not found in children of {parent}")]
    PositionNotFound { parent: String, context: String },

    #[error("cycle detected building path for {object}, all parents already in path {path}")]
    CycleDetected { object: String, path: String },

    #[error("object was deleted: {0}")]
    ObjectDeleted(String),

    #[error("invalid selection path: {0}")]
    InvalidSelectionPath(String),

    #[error("node not found in grid: {0}")]
    NodeNotFound(String),

    #[error("tree is unbounded, cannot expand all nodes")]
    UnboundedTree,

    #[error("row index out of sync with node store: {0}")]
    IndexDesync(String),
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(": {} is not part of the grid", context),
        None => String::new(),
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
