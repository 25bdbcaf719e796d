//! Engine layer of the docket store
//!
//! This crate assembles the pieces from `docket-core`, `docket-cache`, and
//! `docket-storage` into the public API:
//! - Connection: the façade over one table plus its cache
//! - ConnectionBuilder / ConnectionConfig: construction and flag defaults
//! - Selection: in-memory working sets with relational operators
//! - Schema: default document shapes
//! - Modifier: extension hook attached at open
//! - Transaction: all-or-none write batching

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod modifier;
pub mod schema;
pub mod selection;
pub mod transaction;

pub use config::{ConnectionBuilder, ConnectionConfig, DEFAULT_TABLE};
pub use connection::{Connection, FetchOptions, SetOptions};
pub use modifier::Modifier;
pub use schema::Schema;
pub use selection::Selection;
pub use transaction::Transaction;

// Re-export the building blocks callers configure a connection with
pub use docket_cache::{CacheStrategy, EvictionPolicy};
pub use docket_core::{Document, Error, FieldPath, KeyPath, PathSegment, Result};
pub use docket_storage::{JournalMode, StoreOptions, Synchronous};
