//! Cache strategies
//!
//! A [`CacheStrategy`] guards the key→document map that sits in front of
//! the backing store. Two variants share one capability set:
//!
//! - **Unbounded**: admits every patch; optionally runs a [`Sweeper`] that
//!   drops entries past an age threshold.
//! - **Restricted**: holds at most `max_size` entries; admission of a new
//!   key at capacity is arbitrated by an [`EvictionPolicy`].
//!
//! The map is owned here and nowhere else. Callers get deep copies back,
//! never references into the map, so cache state cannot be mutated from
//! outside. A refused admission is silent: the write-through to the
//! backing store has already happened and the cache simply stays as it was.

use crate::entry::{CacheEntry, CacheMap};
use crate::policy::EvictionPolicy;
use crate::sweeper::Sweeper;
use docket_core::Document;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

enum StrategyKind {
    Unbounded { sweeper: Option<Sweeper> },
    Restricted {
        max_size: usize,
        policy: Mutex<EvictionPolicy>,
    },
}

/// Admission/eviction policy plus the map it guards
pub struct CacheStrategy {
    map: Arc<Mutex<CacheMap>>,
    kind: StrategyKind,
}

impl CacheStrategy {
    /// A cache that admits everything and never evicts
    pub fn unbounded() -> Self {
        CacheStrategy {
            map: Arc::new(Mutex::new(CacheMap::new())),
            kind: StrategyKind::Unbounded { sweeper: None },
        }
    }

    /// An unbounded cache with periodic age-based maintenance
    ///
    /// Entries untouched for `max_age` are dropped every `interval`. The
    /// sweeper thread is owned by the strategy and joined on
    /// [`CacheStrategy::shutdown`].
    pub fn unbounded_with_sweep(max_age: Duration, interval: Duration) -> Self {
        let map = Arc::new(Mutex::new(CacheMap::new()));
        let sweeper = Sweeper::spawn(Arc::clone(&map), max_age, interval);
        CacheStrategy {
            map,
            kind: StrategyKind::Unbounded {
                sweeper: Some(sweeper),
            },
        }
    }

    /// A bounded cache arbitrated by `policy`
    pub fn restricted(max_size: usize, policy: EvictionPolicy) -> Self {
        CacheStrategy {
            map: Arc::new(Mutex::new(CacheMap::new())),
            kind: StrategyKind::Restricted {
                max_size,
                policy: Mutex::new(policy),
            },
        }
    }

    /// True for the restricted variant
    pub fn is_bounded(&self) -> bool {
        matches!(self.kind, StrategyKind::Restricted { .. })
    }

    /// Capacity bound, if any
    pub fn max_size(&self) -> Option<usize> {
        match &self.kind {
            StrategyKind::Unbounded { .. } => None,
            StrategyKind::Restricted { max_size, .. } => Some(*max_size),
        }
    }

    /// Admit or refresh an entry
    ///
    /// Updating a resident key never triggers eviction accounting. A new
    /// key at capacity asks the policy to make room; on refusal the patch
    /// is silently dropped and `false` is returned. After an admitting
    /// patch the map never exceeds the configured bound.
    pub fn patch(&self, key: &str, doc: &Document) -> bool {
        let mut map = self.map.lock();

        if let Some(entry) = map.get_mut(key) {
            entry.doc = doc.clone();
            entry.touch();
            return true;
        }

        if let StrategyKind::Restricted { max_size, policy } = &self.kind {
            if *max_size == 0 {
                return false;
            }
            if map.len() >= *max_size && !policy.lock().make_room(&mut map) {
                debug!(key = %key, "cache admission refused");
                return false;
            }
        }

        map.insert(key.to_string(), CacheEntry::new(doc.clone()));
        true
    }

    /// Deep copy of the resident document, refreshing its last-read time
    pub fn lookup(&self, key: &str) -> Option<Document> {
        let mut map = self.map.lock();
        map.get_mut(key).map(|entry| {
            entry.touch();
            entry.doc.clone()
        })
    }

    /// True if the key is resident
    pub fn contains(&self, key: &str) -> bool {
        self.map.lock().contains_key(key)
    }

    /// Drop one entry; absent keys are a no-op
    pub fn evict(&self, key: &str) -> bool {
        self.map.lock().remove(key).is_some()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.map.lock().clear();
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    /// True if nothing is resident
    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    /// First resident document matching the predicate, by key order
    ///
    /// Key order keeps the scan deterministic. The match is touched and
    /// returned as a deep copy.
    pub fn find<F>(&self, mut pred: F) -> Option<(String, Document)>
    where
        F: FnMut(&str, &Document) -> bool,
    {
        let mut map = self.map.lock();
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        for key in keys {
            if let Some(entry) = map.get_mut(&key) {
                if pred(&key, &entry.doc) {
                    entry.touch();
                    return Some((key, entry.doc.clone()));
                }
            }
        }
        None
    }

    /// Stop and join the maintenance worker, if one is running
    pub fn shutdown(&self) {
        if let StrategyKind::Unbounded {
            sweeper: Some(sweeper),
        } = &self.kind
        {
            sweeper.stop();
        }
    }
}

impl Default for CacheStrategy {
    fn default() -> Self {
        Self::unbounded()
    }
}
