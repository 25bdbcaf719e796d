//! In-memory cache layer for the docket store
//!
//! The cache is a read accelerator in front of the backing store, never the
//! durable copy. This crate provides:
//! - CacheEntry: resident document + last-touched timestamp
//! - CacheStrategy: unbounded or capacity-bounded admission
//! - EvictionPolicy: pluggable victim selection for bounded caches
//! - Sweeper: age-based maintenance thread for unbounded caches

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod policy;
pub mod strategy;
pub mod sweeper;

pub use entry::{CacheEntry, CacheMap};
pub use policy::EvictionPolicy;
pub use strategy::CacheStrategy;
pub use sweeper::Sweeper;
