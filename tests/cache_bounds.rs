//! Cache strategy behavior observed through a live connection.

use docketdb::{CacheStrategy, Connection, Document, EvictionPolicy, FetchOptions};
use std::time::Duration;

fn json(s: &str) -> Document {
    s.parse().unwrap()
}

/// Route admission/eviction logs to the test harness when a test fails
fn trace_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn bounded(max: usize, policy: EvictionPolicy) -> Connection {
    trace_init();
    Connection::builder()
        .table("docs")
        .cache(CacheStrategy::restricted(max, policy))
        .open()
        .unwrap()
}

#[test]
fn bounded_cache_never_exceeds_capacity() {
    let db = bounded(4, EvictionPolicy::oldest());
    for i in 0..50i64 {
        db.set(&format!("k{}", i), json(&format!(r#"{{"n": {}}}"#, i)))
            .unwrap();
        assert!(db.cache().len() <= 4, "exceeded bound at write {}", i);
    }
    for i in 0..50i64 {
        db.fetch(&format!("k{}", i)).unwrap();
        assert!(db.cache().len() <= 4, "exceeded bound at read {}", i);
    }
    db.disconnect().unwrap();
}

#[test]
fn oldest_policy_evicts_resident_to_admit_new() {
    let db = bounded(1, EvictionPolicy::oldest());
    db.set("a.n", 1i64).unwrap();
    std::thread::sleep(Duration::from_millis(2));
    db.set("b.n", 2i64).unwrap();

    assert_eq!(db.cache().len(), 1);
    assert!(!db.cache().contains("a"));
    assert!(db.cache().contains("b"));
    // Everything is still durable regardless of residency
    assert!(db.exists("a").unwrap());
    assert!(db.exists("b").unwrap());
    db.disconnect().unwrap();
}

#[test]
fn refuse_new_policy_drops_admissions_silently() {
    let db = bounded(2, EvictionPolicy::refuse_new());
    db.set("a.n", 1i64).unwrap();
    db.set("b.n", 2i64).unwrap();
    db.set("c.n", 3i64).unwrap(); // refused, not an error

    assert_eq!(db.cache().len(), 2);
    assert!(!db.cache().contains("c"));
    assert_eq!(db.fetch("c.n").unwrap().unwrap().as_i64(), Some(3));
    db.disconnect().unwrap();
}

#[test]
fn random_policy_stays_within_bound() {
    let db = bounded(3, EvictionPolicy::random_seeded(11));
    for i in 0..30i64 {
        db.set(&format!("k{}", i), json(&format!(r#"{{"n": {}}}"#, i)))
            .unwrap();
        assert!(db.cache().len() <= 3);
    }
    db.disconnect().unwrap();
}

#[test]
fn assume_cache_is_complete_when_nothing_evicts() {
    let db = Connection::builder()
        .table("docs")
        .cache(CacheStrategy::unbounded())
        .assume_cache(true)
        .open()
        .unwrap();

    for i in 0..10i64 {
        db.set(&format!("k{}", i), json(&format!(r#"{{"n": {}}}"#, i)))
            .unwrap();
    }
    // Every read is served from the map alone and still sees everything
    for i in 0..10i64 {
        let n = db.fetch(&format!("k{}.n", i)).unwrap().unwrap();
        assert_eq!(n.as_i64(), Some(i));
    }
    // An absent key is absent as-is, with no store consultation
    assert!(db.fetch("never").unwrap().is_none());
    db.disconnect().unwrap();
}

#[test]
fn sweeping_cache_disconnects_cleanly() {
    let db = Connection::builder()
        .table("docs")
        .cache(CacheStrategy::unbounded_with_sweep(
            Duration::from_secs(60),
            Duration::from_millis(20),
        ))
        .open()
        .unwrap();
    db.set("a.n", 1i64).unwrap();
    std::thread::sleep(Duration::from_millis(60));
    // Entry is younger than max_age: still resident
    assert!(db.cache().contains("a"));
    // Disconnect cancels the sweeper without hanging
    db.disconnect().unwrap();
}

#[test]
fn eviction_is_cache_only_erase_is_both() {
    let db = Connection::ephemeral("docs").unwrap();
    db.set("a.n", 1i64).unwrap();
    db.set("b.n", 2i64).unwrap();

    db.evict(["a"]);
    assert!(!db.cache().contains("a"));
    assert!(db.exists("a").unwrap()); // still in the store

    db.erase(["b"]).unwrap();
    assert!(!db.cache().contains("b"));
    assert!(!db.exists("b").unwrap());
    db.disconnect().unwrap();
}

#[test]
fn cache_all_mode_caches_flagless_writes() {
    let db = Connection::builder()
        .table("docs")
        .cache_writes(false)
        .cache_all(true)
        .open()
        .unwrap();
    db.set("a.n", 1i64).unwrap();
    assert!(db.cache().contains("a"));
    db.disconnect().unwrap();
}

#[test]
fn uncached_connection_reads_fresh_every_time() {
    let db = Connection::builder()
        .table("docs")
        .cache_writes(false)
        .open()
        .unwrap();
    db.set("a.n", 1i64).unwrap();
    assert!(!db.cache().contains("a"));
    let n = db
        .fetch_with("a.n", FetchOptions::uncached())
        .unwrap()
        .unwrap();
    assert_eq!(n.as_i64(), Some(1));
    assert!(!db.cache().contains("a"));
    db.disconnect().unwrap();
}
