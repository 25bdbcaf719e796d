//! End-to-end connection behavior against a real backing store.

use docketdb::{
    Connection, Document, Error, FetchOptions, Modifier, Result, Schema, SetOptions,
};

fn json(s: &str) -> Document {
    s.parse().unwrap()
}

#[test]
fn path_round_trip_through_the_store() {
    let db = Connection::ephemeral("docs").unwrap();
    let value = json(r#"{"deep": [1, {"flag": true}]}"#);
    db.set("k1.a.b", value.clone()).unwrap();
    let back = db.fetch("k1.a.b").unwrap().unwrap();
    assert_eq!(back, value);
    db.disconnect().unwrap();
}

#[test]
fn cache_and_store_agree_after_writes() {
    let db = Connection::ephemeral("docs").unwrap();
    db.set("u1.profile.name", "Ada").unwrap();
    db.set("u1.profile.logins", 3i64).unwrap();

    let cached = db
        .fetch_with(
            "u1",
            FetchOptions {
                assume_cache: Some(true),
                ..FetchOptions::default()
            },
        )
        .unwrap()
        .unwrap();

    db.evict_all();
    let fresh = db
        .fetch_with("u1", FetchOptions::uncached())
        .unwrap()
        .unwrap();

    assert_eq!(cached, fresh);
    db.disconnect().unwrap();
}

#[test]
fn balance_scenario_modify_adds_fifty() {
    let db = Connection::ephemeral("docs").unwrap();
    db.set("u1.balance", 100i64).unwrap();
    db.modify("u1.balance", |old| {
        Document::from(old.and_then(|d| d.as_i64()).unwrap_or(0) + 50)
    })
    .unwrap();
    assert_eq!(db.fetch("u1.balance").unwrap().unwrap().as_i64(), Some(150));
    db.disconnect().unwrap();
}

#[test]
fn push_needs_an_array_unless_schema_supplies_one() {
    // Without a schema: pushing onto nothing fails, nothing is created
    let db = Connection::ephemeral("docs").unwrap();
    let err = db.push("u1.items", "sword").unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)));
    assert!(!db.exists_with("u1", FetchOptions::uncached()).unwrap());
    db.disconnect().unwrap();

    // With a schema default of {items: []}: the default materializes and
    // the push lands
    let db = Connection::builder()
        .table("docs")
        .schema(Schema::new(json(r#"{"items": []}"#)).unwrap())
        .open()
        .unwrap();
    assert_eq!(db.push("u1.items", "sword").unwrap(), 1);
    let items = db.fetch("u1.items").unwrap().unwrap();
    assert_eq!(items, json(r#"["sword"]"#));
    db.disconnect().unwrap();
}

#[test]
fn schema_default_materializes_on_miss_without_persisting() {
    let db = Connection::builder()
        .table("docs")
        .schema(Schema::new(json(r#"{"balance": 0, "items": []}"#)).unwrap())
        .open()
        .unwrap();

    // A miss yields the default's sub-value...
    let balance = db
        .fetch_with(
            "ghost.balance",
            FetchOptions {
                cache: false,
                ..FetchOptions::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(balance.as_i64(), Some(0));

    // ...but nothing was written to the backing store
    assert_eq!(db.count().unwrap(), 0);

    // With defaults off the miss is a miss
    let nothing = db
        .fetch_with(
            "ghost.balance",
            FetchOptions {
                cache: false,
                defaults: Some(false),
                ..FetchOptions::default()
            },
        )
        .unwrap();
    assert!(nothing.is_none());
    db.disconnect().unwrap();
}

#[test]
fn set_on_absent_key_applies_schema_default_shape() {
    let db = Connection::builder()
        .table("docs")
        .schema(Schema::new(json(r#"{"balance": 0, "tier": "free"}"#)).unwrap())
        .open()
        .unwrap();

    db.set("u1.balance", 25i64).unwrap();
    let root = db.fetch("u1").unwrap().unwrap();
    assert_eq!(root["balance"].as_i64(), Some(25));
    assert_eq!(root["tier"].as_str(), Some("free"));
    db.disconnect().unwrap();
}

#[test]
fn default_is_idempotent() {
    let db = Connection::builder()
        .table("docs")
        .schema(Schema::new(json(r#"{"balance": 0}"#)).unwrap())
        .open()
        .unwrap();

    let first = db.default("u1", Document::object()).unwrap();
    let second = db.default("u1", Document::object()).unwrap();
    assert_eq!(first, second);
    assert_eq!(db.count().unwrap(), 1);
    db.disconnect().unwrap();
}

#[test]
fn documents_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("app.db");

    let db = Connection::open(&path, "docs").unwrap();
    db.set("u1.profile.name", "Ada").unwrap();
    db.disconnect().unwrap();

    let db = Connection::open(&path, "docs").unwrap();
    assert_eq!(
        db.fetch("u1.profile.name").unwrap().unwrap().as_str(),
        Some("Ada")
    );
    db.disconnect().unwrap();
}

#[test]
fn find_stops_at_first_match_in_storage_order() {
    let db = Connection::ephemeral("docs").unwrap();
    for i in 0..10i64 {
        db.set_with(
            &format!("k{}", i),
            json(&format!(r#"{{"n": {}}}"#, i)),
            SetOptions {
                cache: Some(false),
                ..SetOptions::default()
            },
        )
        .unwrap();
    }
    let found = db
        .find_with(|_, d| d["n"].as_i64().unwrap() >= 4, false)
        .unwrap()
        .unwrap();
    assert_eq!(found["n"].as_i64(), Some(4));
    db.disconnect().unwrap();
}

#[test]
fn each_bypasses_cache_and_sees_every_row() {
    let db = Connection::ephemeral("docs").unwrap();
    for i in 0..4i64 {
        db.set(&format!("k{}", i), json(&format!(r#"{{"n": {}}}"#, i)))
            .unwrap();
    }
    let mut keys = Vec::new();
    db.each(|k, _| keys.push(k.to_string())).unwrap();
    keys.sort();
    assert_eq!(keys, vec!["k0", "k1", "k2", "k3"]);
    db.disconnect().unwrap();
}

#[test]
fn transaction_batches_all_or_none() {
    let db = Connection::ephemeral("docs").unwrap();

    let tx = db.transaction().unwrap().unwrap();
    db.set("a.n", 1i64).unwrap();
    db.set("b.n", 2i64).unwrap();
    tx.commit().unwrap();
    assert_eq!(db.count().unwrap(), 2);

    let tx = db.transaction().unwrap().unwrap();
    db.set("c.n", 3i64).unwrap();
    tx.rollback().unwrap();
    assert_eq!(db.count().unwrap(), 2);
    assert!(db.fetch("c").unwrap().is_none());

    db.disconnect().unwrap();
}

struct Auditor;

impl Modifier for Auditor {
    fn name(&self) -> &str {
        "auditor"
    }

    fn attach(&self, conn: &Connection) -> Result<()> {
        conn.set("audit.attached", true)
    }
}

#[test]
fn modifiers_attach_at_open() {
    let db = Connection::builder()
        .table("docs")
        .modifier(Auditor)
        .open()
        .unwrap();
    assert_eq!(db.modifier_names(), vec!["auditor"]);
    assert_eq!(
        db.fetch("audit.attached").unwrap().unwrap().as_bool(),
        Some(true)
    );
    db.disconnect().unwrap();
}

struct Broken;

impl Modifier for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn attach(&self, _conn: &Connection) -> Result<()> {
        Err(Error::InvalidOperation("refusing to attach".to_string()))
    }
}

#[test]
fn failed_modifier_aborts_open() {
    let err = Connection::builder()
        .table("docs")
        .modifier(Broken)
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));
}
