//! SQLite backing store for the docket workspace
//!
//! The store is an opaque key→text table: documents arrive and leave as
//! serialized JSON strings; interpretation belongs to the engine. This
//! crate provides:
//! - SqliteStore: one table in one database, created eagerly at open
//! - StatementCompiler / StatementKind: the closed statement set, compiled
//!   once per table and reused
//! - StoreOptions / JournalMode / Synchronous: open-time knobs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pragma;
pub mod statements;
pub mod store;

pub use pragma::{JournalMode, StoreOptions, Synchronous};
pub use statements::{StatementCompiler, StatementKind};
pub use store::SqliteStore;
