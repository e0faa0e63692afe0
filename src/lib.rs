//! Shale - in-process schemaless document store
//!
//! Shale keeps named tables of schemaless documents in memory. Each table
//! assigns monotonic identifiers, answers exact-match conjunction queries,
//! and maintains optional secondary indexes that turn equality probes into
//! bucket lookups instead of full scans.
//!
//! # Quick Start
//!
//! ```
//! use shaledb::{Document, Predicate, Registry};
//!
//! let mut registry = Registry::new();
//! let users = registry.add("users").unwrap();
//!
//! users.create(Document::new().with("name", "ada").with("role", "admin"));
//! users.create(Document::new().with("name", "grace").with("role", "user"));
//!
//! users.add_index("role").unwrap();
//!
//! let admins = users
//!     .find(&Predicate::new().field("role", "admin"))
//!     .unwrap();
//! assert_eq!(admins.len(), 1);
//! assert_eq!(admins[0].id(), Some(1));
//! ```
//!
//! # Layers
//!
//! - `shale-core`: value model, documents, errors
//! - `shale-store`: the table engine (slots, indexes, query execution) and
//!   the named-table registry
//!
//! This crate is the public facade re-exporting both.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use shale_core::{Document, Error, Result, RowId, Value, ID_FIELD};
pub use shale_store::{
    BuiltinOperator, DeleteReport, FieldIndex, IndexKey, OperatorArgs, OperatorFn, Position,
    Predicate, Registry, Table, TableBuilder, UpdateReport, OPERATOR_PREFIX,
};
