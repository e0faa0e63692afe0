//! Slot-based table storage and query engine for shale
//!
//! This crate is the core of the store:
//! - FieldIndex: secondary index mapping serialized scalar values to the
//!   ordered set of row positions holding that value for one field
//! - Table: the slot array, free list, identifier generator, and query
//!   executor behind create/find/update/delete
//! - Predicate and operator dispatch: exact-match conjunction queries with
//!   a reserved `$` namespace for operators
//! - Registry: an owned name→table map, the thin wrapper callers hand
//!   around instead of global state

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod query;
pub mod registry;
pub mod table;

pub use index::{FieldIndex, IndexKey, Position};
pub use query::{BuiltinOperator, OperatorArgs, OperatorFn, Predicate, OPERATOR_PREFIX};
pub use registry::Registry;
pub use table::{DeleteReport, Table, TableBuilder, UpdateReport};
