//! Core types for the shale document store
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: closed sum type for document field values
//! - Document: one stored row, a field map plus its assigned `_id`
//! - Error / Result: the error hierarchy shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod value;

pub use document::{Document, RowId, ID_FIELD};
pub use error::{Error, Result};
pub use value::Value;
