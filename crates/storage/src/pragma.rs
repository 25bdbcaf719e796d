//! Open-time configuration knobs for the backing store
//!
//! Three settings are applied once when a store is opened: the journal
//! (durability) mode, the synchronization level, and the on-disk page-cache
//! size. Each is a small closed enumeration or integer; there is no
//! re-configuration after open.

use docket_core::{Error, Result};
use rusqlite::Connection;

/// Journal / durability mode of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Delete the rollback journal at commit
    Delete,
    /// Truncate the rollback journal at commit
    Truncate,
    /// Keep the rollback journal, zeroing its header
    Persist,
    /// Keep the rollback journal in memory
    Memory,
    /// Write-ahead logging (default)
    #[default]
    Wal,
    /// No journal; fastest and unsafe on crash
    Off,
}

impl JournalMode {
    fn as_str(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// Synchronization level of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Synchronous {
    /// Hand off to the OS and continue
    Off,
    /// Sync at the most critical moments (default; safe with WAL)
    #[default]
    Normal,
    /// Sync at every critical moment
    Full,
    /// Full, plus directory syncs
    Extra,
}

impl Synchronous {
    fn as_str(self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
            Synchronous::Extra => "EXTRA",
        }
    }
}

/// Knobs applied once at open time
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Journal / durability mode
    pub journal_mode: JournalMode,
    /// Synchronization level
    pub synchronous: Synchronous,
    /// Page-cache size in KiB
    pub page_cache_kib: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            journal_mode: JournalMode::default(),
            synchronous: Synchronous::default(),
            page_cache_kib: 8192,
        }
    }
}

impl StoreOptions {
    /// Apply the knobs to a freshly opened connection
    pub(crate) fn apply(&self, conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", self.journal_mode.as_str())
            .map_err(|e| Error::Construction(format!("failed to set journal mode: {}", e)))?;
        conn.pragma_update(None, "synchronous", self.synchronous.as_str())
            .map_err(|e| Error::Construction(format!("failed to set synchronous level: {}", e)))?;
        // Negative cache_size means KiB rather than pages
        conn.pragma_update(None, "cache_size", -(self.page_cache_kib as i64))
            .map_err(|e| Error::Construction(format!("failed to set page cache size: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = StoreOptions::default();
        assert_eq!(opts.journal_mode, JournalMode::Wal);
        assert_eq!(opts.synchronous, Synchronous::Normal);
        assert_eq!(opts.page_cache_kib, 8192);
    }

    #[test]
    fn test_apply_to_in_memory_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let opts = StoreOptions {
            journal_mode: JournalMode::Memory,
            synchronous: Synchronous::Full,
            page_cache_kib: 1024,
        };
        opts.apply(&conn).unwrap();

        let cache_size: i64 = conn
            .pragma_query_value(None, "cache_size", |row| row.get(0))
            .unwrap();
        assert_eq!(cache_size, -1024);
    }

    #[test]
    fn test_journal_mode_strings() {
        assert_eq!(JournalMode::Wal.as_str(), "WAL");
        assert_eq!(JournalMode::Off.as_str(), "OFF");
        assert_eq!(Synchronous::Normal.as_str(), "NORMAL");
    }
}
