//! Error types for the shale document store
//!
//! One enum covers every failure in the system. All errors are synchronous,
//! local to the call that triggered them, and never retried; no operation
//! leaves a table in an inconsistent state on failure.

use thiserror::Error;

/// Result type alias for shale operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error cases for the shale document store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bulk construction was handed a row that already carries an `_id`.
    /// Identifiers are assigned by the table, never by the caller.
    #[error("rows must not carry a pre-assigned _id")]
    PreassignedId,

    /// A predicate used a `$`-operator that is neither built in nor
    /// registered as an extension.
    #[error("unsupported operator: ${0}")]
    UnknownOperator(String),

    /// Attempt to remove the implicit `_id` index. Identifier lookups
    /// depend on it, so it always exists.
    #[error("the _id index cannot be removed")]
    ProtectedIndex,

    /// Attempt to index a field that already has an index.
    #[error("index already exists for field {0:?}")]
    IndexExists(String),

    /// Attempt to remove an index from a field that has none.
    #[error("no index registered for field {0:?}")]
    IndexNotFound(String),

    /// Malformed input to an otherwise valid call, e.g. a non-object
    /// operand handed to `$eq`.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Registry: the table name is already taken.
    #[error("table {0:?} already exists")]
    TableExists(String),

    /// Registry: no table with that name.
    #[error("no table named {0:?}")]
    TableNotFound(String),
}
