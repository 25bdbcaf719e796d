//! docketdb - embedded document store over SQLite with a write-through cache
//!
//! String keys map to JSON documents stored in a single two-column table.
//! Nested fields are addressed by dotted path specifiers. A configurable
//! in-memory cache fronts the backing store; writes always go through to
//! the store, so the cache is only ever a read accelerator.
//!
//! # Quick Start
//!
//! ```
//! use docketdb::{Connection, Document};
//!
//! # fn main() -> docketdb::Result<()> {
//! // An in-memory store (use Connection::open / the builder for files)
//! let db = Connection::ephemeral("users")?;
//!
//! // Write through a dotted path; the root document is created as needed
//! db.set("u1.profile.name", "Alice")?;
//! db.set("u1.balance", 100i64)?;
//!
//! // Cache-first reads
//! assert_eq!(db.fetch("u1.balance")?.unwrap().as_i64(), Some(100));
//!
//! // Read-modify-write helpers
//! db.modify("u1.balance", |old| {
//!     Document::from(old.and_then(|d| d.as_i64()).unwrap_or(0) + 50)
//! })?;
//! assert_eq!(db.fetch("u1.balance")?.unwrap().as_i64(), Some(150));
//!
//! // In-memory querying over a materialized snapshot
//! let mut adults = db.select(|_, doc| doc["balance"].as_i64().unwrap_or(0) > 0)?;
//! adults.order("balance")?.limit(10);
//!
//! db.disconnect()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The workspace is layered: `docket-core` (documents, paths, errors),
//! `docket-cache` (strategies, eviction, maintenance), `docket-storage`
//! (SQLite table, statement reuse, pragmas), and `docket-engine` (the
//! [`Connection`] façade and [`Selection`] operators). This crate re-exports
//! the engine's public API.

// Re-export the public API from docket-engine
pub use docket_engine::*;
