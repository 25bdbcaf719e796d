//! The connection façade
//!
//! A [`Connection`] owns one backing-store table, one cache strategy, an
//! optional schema, and the attached extensions. Reads are cache-first;
//! writes always go through to the backing store and refresh the cache
//! entry when flagged, when cache-everything mode is on, or when the key is
//! already resident (so a resident entry never diverges from the store).
//!
//! All operations run synchronously to completion. Read-modify-write
//! helpers (`push`, `modify`, `invert`, ...) are not atomic with respect to
//! other connections sharing the same database file; the last write wins at
//! the store level.

use crate::config::ConnectionConfig;
use crate::modifier::Modifier;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::transaction::Transaction;
use docket_cache::CacheStrategy;
use docket_core::{
    project_at_path, set_at_path, value_type_name, Document, Error, KeyPath, Result,
};
use docket_storage::SqliteStore;
use tracing::{debug, trace};

/// Per-call read flags
///
/// Unset (`None`) fields fall back to the connection's
/// [`ConnectionConfig`] defaults.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Admit store hits (and materialized defaults) to the cache
    pub cache: bool,
    /// Serve from the in-memory map only, never touching the store
    pub assume_cache: Option<bool>,
    /// Materialize the schema default on miss (never persisted)
    pub defaults: Option<bool>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            cache: true,
            assume_cache: None,
            defaults: None,
        }
    }
}

impl FetchOptions {
    /// Read without caching side effects
    pub fn uncached() -> Self {
        FetchOptions {
            cache: false,
            ..FetchOptions::default()
        }
    }
}

/// Per-call write flags
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Refresh the cache entry after the write-through
    pub cache: Option<bool>,
    /// Materialize the schema default when the key is absent
    pub defaults: Option<bool>,
}

/// Handle to one document table with a write-through cache
pub struct Connection {
    store: SqliteStore,
    cache: CacheStrategy,
    config: ConnectionConfig,
    schema: Option<Schema>,
    modifiers: Vec<Box<dyn Modifier>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .field("modifiers", &self.modifiers.len())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Builder with full configuration
    pub fn builder() -> crate::config::ConnectionBuilder {
        crate::config::ConnectionBuilder::new()
    }

    /// Open a database file with default configuration
    pub fn open(path: impl Into<std::path::PathBuf>, table: &str) -> Result<Self> {
        Self::builder().path(path).table(table).open()
    }

    /// Open an in-memory connection, for tests and ephemeral data
    pub fn ephemeral(table: &str) -> Result<Self> {
        Self::builder().table(table).open()
    }

    pub(crate) fn assemble(
        store: SqliteStore,
        cache: CacheStrategy,
        config: ConnectionConfig,
        schema: Option<Schema>,
    ) -> Self {
        Connection {
            store,
            cache,
            config,
            schema,
            modifiers: Vec::new(),
        }
    }

    pub(crate) fn adopt_modifiers(&mut self, modifiers: Vec<Box<dyn Modifier>>) {
        self.modifiers = modifiers;
    }

    pub(crate) fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// The table this connection reads and writes
    pub fn table(&self) -> &str {
        self.store.table()
    }

    /// The cache strategy guarding the in-memory map
    pub fn cache(&self) -> &CacheStrategy {
        &self.cache
    }

    /// The per-operation flag defaults
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The schema, if one was configured
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Names of the attached extensions, in attach order
    pub fn modifier_names(&self) -> Vec<&str> {
        self.modifiers.iter().map(|m| m.name()).collect()
    }

    /// Number of rows in the backing store
    pub fn count(&self) -> Result<u64> {
        self.store.count()
    }

    /// Every key in the backing store, storage order
    pub fn keys(&self) -> Result<Vec<String>> {
        self.store.keys()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Cache-first read of the value at a path specifier
    pub fn fetch(&self, pathlike: &str) -> Result<Option<Document>> {
        self.fetch_with(pathlike, FetchOptions::default())
    }

    /// [`Connection::fetch`] with explicit flags
    pub fn fetch_with(&self, pathlike: &str, opts: FetchOptions) -> Result<Option<Document>> {
        let spec: KeyPath = pathlike.parse()?;
        self.fetch_spec(&spec, &opts)
    }

    fn fetch_spec(&self, spec: &KeyPath, opts: &FetchOptions) -> Result<Option<Document>> {
        let assume = opts.assume_cache.unwrap_or(self.config.assume_cache);

        if assume {
            return Ok(self
                .cache
                .lookup(&spec.key)
                .and_then(|doc| project_at_path(&doc, &spec.path)));
        }

        if let Some(doc) = self.cache.lookup(&spec.key) {
            trace!(key = %spec.key, "cache hit");
            return Ok(project_at_path(&doc, &spec.path));
        }

        if let Some(text) = self.store.fetch(&spec.key)? {
            trace!(key = %spec.key, "cache miss, loaded from store");
            let doc: Document = text.parse()?;
            if opts.cache {
                self.cache.patch(&spec.key, &doc);
            }
            return Ok(project_at_path(&doc, &spec.path));
        }

        let defaults = opts.defaults.unwrap_or(self.config.use_defaults);
        if defaults {
            if let Some(schema) = &self.schema {
                trace!(key = %spec.key, "miss materialized from schema default");
                let doc = schema.model().clone();
                if opts.cache {
                    self.cache.patch(&spec.key, &doc);
                }
                return Ok(project_at_path(&doc, &spec.path));
            }
        }

        Ok(None)
    }

    /// True iff `fetch` returns a defined value
    pub fn exists(&self, pathlike: &str) -> Result<bool> {
        Ok(self.fetch(pathlike)?.is_some())
    }

    /// [`Connection::exists`] with explicit flags
    pub fn exists_with(&self, pathlike: &str, opts: FetchOptions) -> Result<bool> {
        Ok(self.fetch_with(pathlike, opts)?.is_some())
    }

    /// First document matching the predicate
    ///
    /// Scans the cache map first (key order), then the backing store in
    /// storage order, stopping at the first match. Rows past the match are
    /// never read or decoded.
    pub fn find<F>(&self, pred: F) -> Result<Option<Document>>
    where
        F: FnMut(&str, &Document) -> bool,
    {
        self.find_with(pred, true)
    }

    /// [`Connection::find`] with the cache scan toggled explicitly
    pub fn find_with<F>(&self, mut pred: F, use_cache: bool) -> Result<Option<Document>>
    where
        F: FnMut(&str, &Document) -> bool,
    {
        if use_cache {
            if let Some((_, doc)) = self.cache.find(|k, d| pred(k, d)) {
                return Ok(Some(doc));
            }
        }
        let mut found = None;
        self.store.scan(|key, text| {
            let doc: Document = text.parse()?;
            if pred(key, &doc) {
                found = Some(doc);
                Ok(false)
            } else {
                Ok(true)
            }
        })?;
        Ok(found)
    }

    /// Call `f` with every document, storage order, always fresh from the
    /// backing store (the cache is bypassed)
    pub fn each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &Document),
    {
        self.store.scan(|key, text| {
            let doc: Document = text.parse()?;
            f(key, &doc);
            Ok(true)
        })
    }

    /// Materialize a working set of every document matching the predicate
    ///
    /// Scans and decodes the full table: O(table size) in time and memory.
    /// Expensive for large stores; prefer [`Connection::select_key`] when a
    /// single document is wanted.
    pub fn select<F>(&self, mut pred: F) -> Result<Selection>
    where
        F: FnMut(&str, &Document) -> bool,
    {
        let mut entries = Vec::new();
        self.store.scan(|key, text| {
            let doc: Document = text.parse()?;
            if pred(key, &doc) {
                entries.push((key.to_string(), doc));
            }
            Ok(true)
        })?;
        debug!(table = self.table(), rows = entries.len(), "materialized selection");
        Ok(Selection::new(self.table(), entries))
    }

    /// Materialize a singleton working set from one path specifier
    pub fn select_key(&self, pathlike: &str) -> Result<Selection> {
        let spec: KeyPath = pathlike.parse()?;
        let mut entries = Vec::new();
        if let Some(doc) = self.fetch_spec(&spec, &FetchOptions::default())? {
            entries.push((spec.key.clone(), doc));
        }
        Ok(Selection::new(self.table(), entries))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Write the value at a path specifier, through to the backing store
    pub fn set(&self, pathlike: &str, value: impl Into<Document>) -> Result<()> {
        self.set_with(pathlike, value, SetOptions::default())
    }

    /// [`Connection::set`] with explicit flags
    pub fn set_with(
        &self,
        pathlike: &str,
        value: impl Into<Document>,
        opts: SetOptions,
    ) -> Result<()> {
        let spec: KeyPath = pathlike.parse()?;
        self.set_spec(&spec, value.into(), &opts)
    }

    fn set_spec(&self, spec: &KeyPath, value: Document, opts: &SetOptions) -> Result<()> {
        let defaults = opts.defaults.unwrap_or(self.config.use_defaults);

        // Absent key with a schema: materialize the default shape, apply the
        // write into the copy, and persist that. The recursion runs with
        // defaults off so the materialization happens exactly once.
        if defaults {
            if let Some(schema) = &self.schema {
                if self.store.fetch(&spec.key)?.is_none() {
                    let mut root = schema.model().clone();
                    set_at_path(&mut root, &spec.path, value)?;
                    let inner = SetOptions {
                        defaults: Some(false),
                        ..opts.clone()
                    };
                    return self.set_spec(&KeyPath::root(spec.key.clone()), root, &inner);
                }
            }
        }

        let root = if spec.path.is_root() {
            value.ensure_container()?;
            value
        } else {
            let mut root = match self.cache.lookup(&spec.key) {
                Some(doc) => doc,
                None => match self.store.fetch(&spec.key)? {
                    Some(text) => text.parse()?,
                    None => Document::object(),
                },
            };
            set_at_path(&mut root, &spec.path, value)?;
            root
        };

        self.store.upsert(&spec.key, &root.to_json_string())?;

        let cache_flag = opts.cache.unwrap_or(self.config.cache_writes);
        if cache_flag || self.config.cache_all || self.cache.contains(&spec.key) {
            self.cache.patch(&spec.key, &root);
        }
        Ok(())
    }

    /// Drop the named keys from the cache map only
    ///
    /// The backing store is untouched. Absent keys are a no-op.
    pub fn evict<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.cache.evict(key.as_ref());
        }
    }

    /// Clear the entire cache map
    pub fn evict_all(&self) {
        self.cache.clear();
    }

    /// Evict the named keys and delete their rows in one batched statement
    ///
    /// Returns the number of rows deleted. Zero keys is a no-op.
    pub fn erase<I, S>(&self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        if keys.is_empty() {
            return Ok(0);
        }
        for key in &keys {
            self.cache.evict(key);
        }
        let deleted = self.store.delete_many(&keys)?;
        debug!(requested = keys.len(), deleted, "erased keys");
        Ok(deleted)
    }

    // ========================================================================
    // Idempotent materialization
    // ========================================================================

    /// Persist the schema instance of `partial` under `key`, unless the key
    /// already exists
    ///
    /// Without a schema the partial itself (a container) is persisted.
    /// Returns the stored document either way; calling twice is the same as
    /// calling once.
    pub fn default(&self, key: &str, partial: impl Into<Document>) -> Result<Document> {
        if key.is_empty() || key.contains('.') {
            return Err(Error::PathResolution(format!(
                "'{}' is not a bare root key",
                key
            )));
        }
        if let Some(text) = self.store.fetch(key)? {
            return text.parse();
        }
        let doc = match &self.schema {
            Some(schema) => schema.instance(&partial.into()),
            None => partial.into(),
        };
        doc.ensure_container()?;
        let spec = KeyPath::root(key);
        self.set_spec(
            &spec,
            doc.clone(),
            &SetOptions {
                defaults: Some(false),
                ..SetOptions::default()
            },
        )?;
        Ok(doc)
    }

    /// Write `value` at the path unless something is already there
    ///
    /// Returns the value now at the path.
    pub fn ensure(&self, pathlike: &str, value: impl Into<Document>) -> Result<Document> {
        if let Some(existing) = self.fetch(pathlike)? {
            return Ok(existing);
        }
        let value = value.into();
        self.set_with(pathlike, value.clone(), SetOptions::default())?;
        Ok(value)
    }

    // ========================================================================
    // Read-modify-write helpers (not atomic across connections)
    // ========================================================================

    /// Fetch the value at the path, transform it, write it back
    ///
    /// Returns the up-to-date root document after the write.
    pub fn modify<F>(&self, pathlike: &str, f: F) -> Result<Document>
    where
        F: FnOnce(Option<Document>) -> Document,
    {
        let spec: KeyPath = pathlike.parse()?;
        let current = self.fetch_spec(&spec, &FetchOptions::default())?;
        let next = f(current);
        self.set_spec(&spec, next, &SetOptions::default())?;
        self.fetch_spec(&KeyPath::root(spec.key.clone()), &FetchOptions::default())?
            .ok_or_else(|| {
                Error::InvalidOperation(format!("document '{}' vanished during modify", spec.key))
            })
    }

    /// Toggle the boolean at the path and return the new value
    ///
    /// Anything other than JSON `true` (including an absent value) reads as
    /// false and inverts to `true`.
    pub fn invert(&self, pathlike: &str) -> Result<bool> {
        let spec: KeyPath = pathlike.parse()?;
        let current = self
            .fetch_spec(&spec, &FetchOptions::default())?
            .and_then(|d| d.as_bool())
            .unwrap_or(false);
        let next = !current;
        self.set_spec(&spec, Document::from(next), &SetOptions::default())?;
        Ok(next)
    }

    // ========================================================================
    // Array helpers
    // ========================================================================

    fn fetch_array(&self, spec: &KeyPath) -> Result<Vec<serde_json::Value>> {
        match self.fetch_spec(spec, &FetchOptions::default())? {
            Some(doc) => match doc.into_inner() {
                serde_json::Value::Array(arr) => Ok(arr),
                other => Err(Error::InvalidDocument(format!(
                    "value at '{}' is {}, not an array",
                    spec,
                    value_type_name(&other)
                ))),
            },
            None => Err(Error::InvalidDocument(format!("no array at '{}'", spec))),
        }
    }

    fn store_array(&self, spec: &KeyPath, arr: Vec<serde_json::Value>) -> Result<()> {
        self.set_spec(
            spec,
            Document::from_value(serde_json::Value::Array(arr)),
            &SetOptions::default(),
        )
    }

    /// Append to the array at the path; returns the new length
    pub fn push(&self, pathlike: &str, value: impl Into<Document>) -> Result<usize> {
        let spec: KeyPath = pathlike.parse()?;
        let mut arr = self.fetch_array(&spec)?;
        arr.push(value.into().into_inner());
        let len = arr.len();
        self.store_array(&spec, arr)?;
        Ok(len)
    }

    /// Remove and return the last element of the array at the path
    pub fn pop(&self, pathlike: &str) -> Result<Option<Document>> {
        let spec: KeyPath = pathlike.parse()?;
        let mut arr = self.fetch_array(&spec)?;
        let popped = arr.pop().map(Document::from_value);
        self.store_array(&spec, arr)?;
        Ok(popped)
    }

    /// Remove and return the first element of the array at the path
    pub fn shift(&self, pathlike: &str) -> Result<Option<Document>> {
        let spec: KeyPath = pathlike.parse()?;
        let mut arr = self.fetch_array(&spec)?;
        let shifted = if arr.is_empty() {
            None
        } else {
            Some(Document::from_value(arr.remove(0)))
        };
        self.store_array(&spec, arr)?;
        Ok(shifted)
    }

    /// Remove the first element deep-equal to `value` from the array at the
    /// path; returns whether an element was removed
    pub fn remove(&self, pathlike: &str, value: impl Into<Document>) -> Result<bool> {
        let spec: KeyPath = pathlike.parse()?;
        let target = value.into().into_inner();
        let mut arr = self.fetch_array(&spec)?;
        let removed = match arr.iter().position(|v| *v == target) {
            Some(pos) => {
                arr.remove(pos);
                true
            }
            None => false,
        };
        self.store_array(&spec, arr)?;
        Ok(removed)
    }

    /// Keep only the window `[start, end)` of the array at the path
    ///
    /// The stored array becomes the window; the window is returned. An
    /// unset `end` means the array's length.
    pub fn slice(&self, pathlike: &str, start: usize, end: Option<usize>) -> Result<Document> {
        let spec: KeyPath = pathlike.parse()?;
        let arr = self.fetch_array(&spec)?;
        let end = end.unwrap_or(arr.len()).min(arr.len());
        let start = start.min(end);
        let window: Vec<serde_json::Value> = arr[start..end].to_vec();
        self.store_array(&spec, window.clone())?;
        Ok(Document::from_value(serde_json::Value::Array(window)))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Begin a transaction, or `None` if one is already open
    pub fn transaction(&self) -> Result<Option<Transaction<'_>>> {
        if self.store.in_transaction() {
            return Ok(None);
        }
        self.store.begin()?;
        Ok(Some(Transaction::new(self)))
    }

    /// Close the connection: stop the cache maintenance worker, clear the
    /// map, close the backing-store handle
    ///
    /// Consumes the connection; a second close does not compile.
    pub fn disconnect(self) -> Result<()> {
        self.cache.shutdown();
        self.cache.clear();
        self.store.close()
    }
}
