//! The SQLite-backed store
//!
//! One store owns one table of two columns: `Key` (text, primary key) and
//! `Val` (text, the serialized document). The table is created eagerly at
//! open, before statements are compiled, and the configuration knobs are
//! applied exactly once. Everything after open is a storage error, never a
//! construction error.

use crate::pragma::StoreOptions;
use crate::statements::{StatementCompiler, StatementKind};
use docket_core::{Error, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Handle to one table in one SQLite database
pub struct SqliteStore {
    conn: Connection,
    statements: StatementCompiler,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and table
    pub fn open(path: &Path, table: &str, options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            Error::Construction(format!("failed to open '{}': {}", path.display(), e))
        })?;
        let store = Self::init(conn, table, options)?;
        info!(path = %path.display(), table, "opened backing store");
        Ok(store)
    }

    /// Open an in-memory database, for tests and ephemeral use
    pub fn open_in_memory(table: &str, options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Construction(format!("failed to open in-memory store: {}", e)))?;
        Self::init(conn, table, options)
    }

    fn init(conn: Connection, table: &str, options: &StoreOptions) -> Result<Self> {
        validate_table_name(table)?;
        options.apply(&conn)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\"Key\" TEXT PRIMARY KEY, \"Val\" TEXT)",
            table
        ))
        .map_err(|e| Error::Construction(format!("failed to create table '{}': {}", table, e)))?;
        let statements = StatementCompiler::new(&conn, table)?;
        Ok(SqliteStore { conn, statements })
    }

    /// The table this store reads and writes
    pub fn table(&self) -> &str {
        self.statements.table()
    }

    /// Insert or replace one row
    pub fn upsert(&self, key: &str, val: &str) -> Result<()> {
        let mut stmt = self.statements.query(&self.conn, StatementKind::Upsert)?;
        stmt.execute(rusqlite::params![key, val])
            .map_err(storage_err)?;
        Ok(())
    }

    /// Fetch one value by key
    pub fn fetch(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.statements.query(&self.conn, StatementKind::FetchOne)?;
        stmt.query_row(rusqlite::params![key], |row| row.get::<_, String>(0))
            .optional()
            .map_err(storage_err)
    }

    /// Walk every row in storage order
    ///
    /// The callback returns `Ok(false)` to stop the scan early; its errors
    /// abort the scan and propagate.
    pub fn scan<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &str) -> Result<bool>,
    {
        let mut stmt = self.statements.query(&self.conn, StatementKind::ListAll)?;
        let mut rows = stmt.query([]).map_err(storage_err)?;
        while let Some(row) = rows.next().map_err(storage_err)? {
            let key: String = row.get(0).map_err(storage_err)?;
            let val: String = row.get(1).map_err(storage_err)?;
            if !f(&key, &val)? {
                break;
            }
        }
        Ok(())
    }

    /// Every key, in storage order
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.statements.query(&self.conn, StatementKind::ListKeys)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage_err)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(storage_err)
    }

    /// Number of rows
    pub fn count(&self) -> Result<u64> {
        let mut stmt = self.statements.query(&self.conn, StatementKind::Count)?;
        stmt.query_row([], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(storage_err)
    }

    /// Delete the given keys in one batched statement
    ///
    /// The arity of the `IN` list varies per call, so this statement is
    /// rendered here rather than in the compiler; it still goes through the
    /// prepared-statement cache. Zero keys is a no-op.
    pub fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"Key\" IN ({})",
            self.table(),
            placeholders
        );
        let mut stmt = self.conn.prepare_cached(&sql).map_err(storage_err)?;
        stmt.execute(rusqlite::params_from_iter(keys.iter()))
            .map_err(storage_err)
    }

    /// True while an explicit transaction is open on this handle
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Begin an explicit transaction
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(storage_err)
    }

    /// Commit the open transaction
    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(storage_err)
    }

    /// Roll back the open transaction
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(storage_err)
    }

    /// Close the handle
    ///
    /// Consumes the store; there is no second close.
    pub fn close(self) -> Result<()> {
        let table = self.statements.table().to_string();
        self.conn
            .close()
            .map_err(|(_, e)| Error::Storage(e.to_string()))?;
        info!(table = %table, "closed backing store");
        Ok(())
    }
}

fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::Construction(format!(
            "table name '{}' is not a bare identifier",
            table
        )))
    }
}
