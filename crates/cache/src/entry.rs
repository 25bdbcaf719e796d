//! Cache entries
//!
//! A [`CacheEntry`] pairs a resident document with its last-touched
//! timestamp. The timestamp is bookkeeping for eviction and age-based
//! sweeping; it lives beside the document, never inside it, so cached
//! returns can never leak it to callers.

use docket_core::Document;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// The in-memory cache map
pub type CacheMap = HashMap<String, CacheEntry>;

/// A resident document plus its last-read/last-write timestamp
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached document
    pub doc: Document,
    /// Millis since the epoch of the last read or write of this entry
    pub touched_at: u64,
}

impl CacheEntry {
    /// Create an entry touched now
    pub fn new(doc: Document) -> Self {
        CacheEntry {
            doc,
            touched_at: now_millis(),
        }
    }

    /// Refresh the timestamp
    pub fn touch(&mut self) {
        self.touched_at = now_millis();
    }
}

/// Current wall-clock time in millis since the epoch
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
