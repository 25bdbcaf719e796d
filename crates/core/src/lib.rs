//! Core types for the docket store
//!
//! This crate defines the foundational types used throughout the workspace:
//! - Document: JSON document newtype with the root-container rule
//! - KeyPath / FieldPath / PathSegment: parsed path specifiers
//! - Path operations: get_at_path, set_at_path, delete_at_path
//! - Error: the shared error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod path;

pub use document::{value_type_name, Document};
pub use error::{Error, Result};
pub use path::{
    delete_at_path, get_at_path, get_at_path_mut, project_at_path, set_at_path, FieldPath,
    KeyPath, PathSegment,
};
