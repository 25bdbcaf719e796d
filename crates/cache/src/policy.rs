//! Eviction policies
//!
//! A policy decides, given a full cache map, whether and how to free
//! capacity for a new entry. Policies are the only code allowed to remove
//! entries for capacity reasons. Each decision is a pure function of the
//! map state (plus the policy's own RNG state for [`EvictionPolicy::Random`]),
//! so victims are reproducible in tests.

use crate::entry::CacheMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Pluggable eviction algorithm for a bounded cache
#[derive(Debug)]
pub enum EvictionPolicy {
    /// Evict the entry with the oldest timestamp (key order breaks ties)
    Oldest,
    /// Evict a uniformly chosen entry
    Random(SmallRng),
    /// Never evict; refuse every admission past capacity
    RefuseNew,
}

impl EvictionPolicy {
    /// Evict-oldest-by-timestamp
    pub fn oldest() -> Self {
        EvictionPolicy::Oldest
    }

    /// Evict-random with an entropy-seeded generator
    pub fn random() -> Self {
        EvictionPolicy::Random(SmallRng::from_entropy())
    }

    /// Evict-random with a fixed seed, for reproducible victim selection
    pub fn random_seeded(seed: u64) -> Self {
        EvictionPolicy::Random(SmallRng::seed_from_u64(seed))
    }

    /// Refuse-new: the cache keeps its first residents
    pub fn refuse_new() -> Self {
        EvictionPolicy::RefuseNew
    }

    /// Free at least one slot in `map`, or refuse
    ///
    /// Returns true if the admission may proceed. A refusal leaves the map
    /// untouched; it is an expected outcome, not a failure.
    pub fn make_room(&mut self, map: &mut CacheMap) -> bool {
        match self {
            EvictionPolicy::Oldest => {
                let victim = map
                    .iter()
                    .min_by(|(ka, ea), (kb, eb)| {
                        ea.touched_at.cmp(&eb.touched_at).then_with(|| ka.cmp(kb))
                    })
                    .map(|(k, _)| k.clone());
                if let Some(key) = victim {
                    debug!(key = %key, "evicting oldest cache entry");
                    map.remove(&key);
                }
                true
            }
            EvictionPolicy::Random(rng) => {
                if map.is_empty() {
                    return true;
                }
                // Sort before sampling so the victim depends only on map
                // state and RNG state, not hash iteration order.
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let key = keys[rng.gen_range(0..keys.len())].clone();
                debug!(key = %key, "evicting random cache entry");
                map.remove(&key);
                true
            }
            EvictionPolicy::RefuseNew => false,
        }
    }
}
