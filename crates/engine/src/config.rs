//! Connection configuration and builder
//!
//! [`ConnectionBuilder`] is the one place a connection is assembled: the
//! database location, the table, the open-time store knobs, the cache
//! strategy, the schema, the extension list, and the per-operation flag
//! defaults all arrive here. `Connection::open` and `Connection::ephemeral`
//! are shortcuts through the builder with defaults.

use crate::connection::Connection;
use crate::modifier::Modifier;
use crate::schema::Schema;
use docket_cache::CacheStrategy;
use docket_core::Result;
use docket_storage::{JournalMode, SqliteStore, StoreOptions, Synchronous};
use std::path::PathBuf;
use tracing::debug;

/// Default table name when none is configured
pub const DEFAULT_TABLE: &str = "docket";

/// Per-operation flag defaults
///
/// Operations take option structs whose unset fields fall back to these
/// values, so one connection can be configured once instead of flagging
/// every call.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Default for the `cache` flag of writes: refresh the cache entry on set
    pub cache_writes: bool,
    /// Default for `assume_cache`: serve reads from the map alone.
    /// Only sound when eviction is disabled and the cache is complete.
    pub assume_cache: bool,
    /// Default for `defaults`: materialize schema defaults on miss
    pub use_defaults: bool,
    /// Cache-everything mode: every write refreshes the cache regardless of
    /// per-call flags
    pub cache_all: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            cache_writes: true,
            assume_cache: false,
            use_defaults: true,
            cache_all: false,
        }
    }
}

/// Builder for [`Connection`]
///
/// # Example
///
/// ```ignore
/// let conn = Connection::builder()
///     .path("/data/app.db")
///     .table("users")
///     .journal_mode(JournalMode::Wal)
///     .cache(CacheStrategy::restricted(1000, EvictionPolicy::oldest()))
///     .schema(Schema::new(serde_json::json!({"balance": 0}))?)
///     .open()?;
/// ```
pub struct ConnectionBuilder {
    path: Option<PathBuf>,
    table: String,
    store_options: StoreOptions,
    cache: CacheStrategy,
    config: ConnectionConfig,
    schema: Option<Schema>,
    modifiers: Vec<Box<dyn Modifier>>,
}

impl ConnectionBuilder {
    /// Create a builder with defaults (in-memory, unbounded cache)
    pub fn new() -> Self {
        ConnectionBuilder {
            path: None,
            table: DEFAULT_TABLE.to_string(),
            store_options: StoreOptions::default(),
            cache: CacheStrategy::unbounded(),
            config: ConnectionConfig::default(),
            schema: None,
            modifiers: Vec::new(),
        }
    }

    /// Database file path; unset means in-memory
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Table name (one table per connection)
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Journal / durability mode
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.store_options.journal_mode = mode;
        self
    }

    /// Synchronization level
    pub fn synchronous(mut self, level: Synchronous) -> Self {
        self.store_options.synchronous = level;
        self
    }

    /// On-disk page-cache size in KiB
    pub fn page_cache_kib(mut self, kib: u32) -> Self {
        self.store_options.page_cache_kib = kib;
        self
    }

    /// Cache strategy guarding the in-memory map
    pub fn cache(mut self, strategy: CacheStrategy) -> Self {
        self.cache = strategy;
        self
    }

    /// Default for the write-path `cache` flag
    pub fn cache_writes(mut self, on: bool) -> Self {
        self.config.cache_writes = on;
        self
    }

    /// Default for the `assume_cache` read flag
    pub fn assume_cache(mut self, on: bool) -> Self {
        self.config.assume_cache = on;
        self
    }

    /// Default for the `defaults` flag
    pub fn use_defaults(mut self, on: bool) -> Self {
        self.config.use_defaults = on;
        self
    }

    /// Cache-everything mode
    pub fn cache_all(mut self, on: bool) -> Self {
        self.config.cache_all = on;
        self
    }

    /// Default document shape for this table
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Register an extension; attached in registration order at open
    pub fn modifier(mut self, modifier: impl Modifier + 'static) -> Self {
        self.modifiers.push(Box::new(modifier));
        self
    }

    /// Open the connection
    ///
    /// Applies the store knobs, creates the table eagerly, compiles the
    /// statement set, then attaches every modifier. Any failure is returned
    /// to the caller; nothing is retried.
    pub fn open(self) -> Result<Connection> {
        let store = match &self.path {
            Some(path) => SqliteStore::open(path, &self.table, &self.store_options)?,
            None => SqliteStore::open_in_memory(&self.table, &self.store_options)?,
        };

        let mut conn = Connection::assemble(store, self.cache, self.config, self.schema);
        for modifier in &self.modifiers {
            debug!(modifier = modifier.name(), "attaching modifier");
            modifier.attach(&conn)?;
        }
        conn.adopt_modifiers(self.modifiers);
        Ok(conn)
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
