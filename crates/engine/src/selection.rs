//! In-memory working sets
//!
//! A [`Selection`] is a mutable snapshot of documents materialized once by
//! `Connection::select` / `select_key`. Its operators (order, filter,
//! limit, group, join, map) mutate the working set in place and chain; none
//! of them reach back to the backing store or the shared cache. Entries
//! keep their insertion order, which is what `order` rearranges and `limit`
//! windows over.

use docket_core::{get_at_path, project_at_path, Document, FieldPath, KeyPath, Result};
use std::cmp::Ordering;

/// A mutable, ordered key→document working set
pub struct Selection {
    holds: String,
    entries: Vec<(String, Document)>,
}

impl Selection {
    /// Build a working set over entries from `holds` (the source table)
    pub fn new(holds: impl Into<String>, entries: Vec<(String, Document)>) -> Self {
        Selection {
            holds: holds.into(),
            entries,
        }
    }

    /// The originating table name, used as the default join label
    pub fn holds(&self) -> &str {
        &self.holds
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the working set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The keys, in iteration order
    pub fn indexes(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// The documents, in iteration order
    pub fn documents(&self) -> Vec<&Document> {
        self.entries.iter().map(|(_, d)| d).collect()
    }

    /// Iterate entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Look up a single value by path specifier, same resolution as the
    /// connection's reads
    pub fn retrieve(&self, pathlike: &str) -> Result<Option<Document>> {
        let spec: KeyPath = pathlike.parse()?;
        Ok(self
            .entries
            .iter()
            .find(|(k, _)| *k == spec.key)
            .and_then(|(_, d)| project_at_path(d, &spec.path)))
    }

    /// Stable sort by the value at a path inside each document, ascending
    ///
    /// Entries missing the path sort last.
    pub fn order(&mut self, field_path: &str) -> Result<&mut Self> {
        let path: FieldPath = field_path.parse()?;
        self.entries.sort_by(|a, b| {
            match (get_at_path(&a.1, &path), get_at_path(&b.1, &path)) {
                (Some(x), Some(y)) => compare_values(x, y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        Ok(self)
    }

    /// Stable sort with an arbitrary document comparator
    pub fn order_by<F>(&mut self, mut cmp: F) -> &mut Self
    where
        F: FnMut(&Document, &Document) -> Ordering,
    {
        self.entries.sort_by(|a, b| cmp(&a.1, &b.1));
        self
    }

    /// Retain only entries the predicate accepts
    pub fn filter<F>(&mut self, mut pred: F) -> &mut Self
    where
        F: FnMut(&str, &Document) -> bool,
    {
        self.entries.retain(|(k, d)| pred(k, d));
        self
    }

    /// Keep the first `amount` entries
    pub fn limit(&mut self, amount: usize) -> &mut Self {
        self.limit_from(0, amount)
    }

    /// Keep the contiguous window `[offset, offset + amount)` by iteration
    /// order, discarding everything outside it
    ///
    /// An offset past the end leaves the working set empty; a window
    /// running past the end is clamped.
    pub fn limit_from(&mut self, offset: usize, amount: usize) -> &mut Self {
        let kept: Vec<(String, Document)> =
            self.entries.drain(..).skip(offset).take(amount).collect();
        self.entries = kept;
        self
    }

    /// Re-key the working set by the value at a path inside each document
    ///
    /// Entries sharing a group value collapse into one object keyed by
    /// their original keys. Entries lacking the path are dropped. Group
    /// order follows first appearance.
    pub fn group(&mut self, field_path: &str) -> Result<&mut Self> {
        let path: FieldPath = field_path.parse()?;
        let mut groups: Vec<(String, Document)> = Vec::new();
        for (key, doc) in self.entries.drain(..) {
            let group_key = match get_at_path(&doc, &path) {
                Some(v) => join_key_string(v),
                None => continue,
            };
            match groups.iter_mut().find(|(g, _)| *g == group_key) {
                Some((_, bucket)) => {
                    bucket
                        .as_object_mut()
                        .expect("group buckets are objects")
                        .insert(key, doc.into_inner());
                }
                None => {
                    let mut bucket = Document::object();
                    bucket
                        .as_object_mut()
                        .expect("group buckets are objects")
                        .insert(key, doc.into_inner());
                    groups.push((group_key, bucket));
                }
            }
        }
        self.entries = groups;
        Ok(self)
    }

    /// Merge matching rows of `other` into this working set
    ///
    /// Each entry of `other` is joined by its own key; a match grafts the
    /// other document under `self_doc[other.holds()]`. Rows of `other`
    /// without a matching key here are silently skipped; no rows are
    /// created.
    pub fn join(&mut self, other: &Selection) -> &mut Self {
        let label = other.holds.clone();
        self.join_entries(other, None, |mine, _, other_doc| {
            if let Some(map) = mine.as_object_mut() {
                map.insert(label.clone(), other_doc.as_inner().clone());
            }
        });
        self
    }

    /// [`Selection::join`], with the join key read from `field_path` inside
    /// each of `other`'s documents instead of its entry key
    pub fn join_on(&mut self, other: &Selection, field_path: &str) -> Result<&mut Self> {
        let path: FieldPath = field_path.parse()?;
        let label = other.holds.clone();
        self.join_entries(other, Some(&path), |mine, _, other_doc| {
            if let Some(map) = mine.as_object_mut() {
                map.insert(label.clone(), other_doc.as_inner().clone());
            }
        });
        Ok(self)
    }

    /// Join with a custom merge strategy
    ///
    /// The strategy is invoked as `(self_doc, other_key, other_doc)` for
    /// every matching row and mutates `self_doc` in place.
    pub fn join_with<F>(
        &mut self,
        other: &Selection,
        field_path: Option<&str>,
        strategy: F,
    ) -> Result<&mut Self>
    where
        F: FnMut(&mut Document, &str, &Document),
    {
        let path = match field_path {
            Some(p) => Some(p.parse::<FieldPath>()?),
            None => None,
        };
        self.join_entries(other, path.as_ref(), strategy);
        Ok(self)
    }

    fn join_entries<F>(&mut self, other: &Selection, path: Option<&FieldPath>, mut strategy: F)
    where
        F: FnMut(&mut Document, &str, &Document),
    {
        for (other_key, other_doc) in &other.entries {
            let join_key = match path {
                None => Some(other_key.clone()),
                Some(p) => get_at_path(other_doc, p).map(join_key_string),
            };
            if let Some(jk) = join_key {
                if let Some((_, mine)) = self.entries.iter_mut().find(|(k, _)| *k == jk) {
                    strategy(mine, other_key, other_doc);
                }
            }
        }
    }

    /// Replace every document with the transformer's return value, in place
    pub fn map<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(&str, &Document) -> Document,
    {
        for (key, doc) in &mut self.entries {
            *doc = f(key, doc);
        }
        self
    }
}

/// Join/group key rendering: strings verbatim, everything else as JSON text
fn join_key_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ascending order over JSON values: null < bool < number < string <
/// array < object, with like types compared directly
fn compare_values(a: &serde_json::Value, b: &serde_json::Value) -> Ordering {
    use serde_json::Value;

    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(s: &str) -> Document {
        s.parse().unwrap()
    }

    fn users() -> Selection {
        Selection::new(
            "Users",
            vec![
                ("u1".to_string(), doc(r#"{"name": "Cara", "age": 31}"#)),
                ("u2".to_string(), doc(r#"{"name": "Abe", "age": 44}"#)),
                ("u3".to_string(), doc(r#"{"name": "Bea", "age": 27}"#)),
            ],
        )
    }

    #[test]
    fn test_accessors() {
        let sel = users();
        assert_eq!(sel.holds(), "Users");
        assert_eq!(sel.len(), 3);
        assert_eq!(sel.indexes(), vec!["u1", "u2", "u3"]);
        assert_eq!(sel.documents()[0]["name"].as_str(), Some("Cara"));
    }

    #[test]
    fn test_retrieve_by_path() {
        let sel = users();
        let name = sel.retrieve("u2.name").unwrap().unwrap();
        assert_eq!(name.as_str(), Some("Abe"));
        assert!(sel.retrieve("u9.name").unwrap().is_none());
        assert!(sel.retrieve("u2.missing").unwrap().is_none());
    }

    #[test]
    fn test_order_by_field() {
        let mut sel = users();
        sel.order("age").unwrap();
        assert_eq!(sel.indexes(), vec!["u3", "u1", "u2"]);
    }

    #[test]
    fn test_order_missing_field_sorts_last() {
        let mut sel = Selection::new(
            "Users",
            vec![
                ("a".to_string(), doc(r#"{}"#)),
                ("b".to_string(), doc(r#"{"rank": 1}"#)),
            ],
        );
        sel.order("rank").unwrap();
        assert_eq!(sel.indexes(), vec!["b", "a"]);
    }

    #[test]
    fn test_order_is_stable() {
        let mut sel = Selection::new(
            "Users",
            vec![
                ("x".to_string(), doc(r#"{"n": 1}"#)),
                ("y".to_string(), doc(r#"{"n": 1}"#)),
                ("z".to_string(), doc(r#"{"n": 0}"#)),
            ],
        );
        sel.order("n").unwrap();
        assert_eq!(sel.indexes(), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_order_by_comparator() {
        let mut sel = users();
        sel.order_by(|a, b| {
            b["age"]
                .as_i64()
                .unwrap_or(0)
                .cmp(&a["age"].as_i64().unwrap_or(0))
        });
        assert_eq!(sel.indexes(), vec!["u2", "u1", "u3"]);
    }

    #[test]
    fn test_filter_removes_by_key() {
        let mut sel = users();
        sel.filter(|_, d| d["age"].as_i64().unwrap() < 40);
        assert_eq!(sel.indexes(), vec!["u1", "u3"]);
    }

    #[test]
    fn test_limit_keeps_contiguous_window() {
        let mut sel = users();
        sel.limit_from(1, 1);
        assert_eq!(sel.indexes(), vec!["u2"]);
    }

    #[test]
    fn test_limit_single_argument_is_amount() {
        let mut sel = users();
        sel.limit(2);
        assert_eq!(sel.indexes(), vec!["u1", "u2"]);
    }

    #[test]
    fn test_limit_window_clamps() {
        let mut sel = users();
        sel.limit_from(2, 10);
        assert_eq!(sel.indexes(), vec!["u3"]);

        let mut sel = users();
        sel.limit_from(10, 5);
        assert!(sel.is_empty());
    }

    #[test]
    fn test_limit_zero_empties() {
        let mut sel = users();
        sel.limit(0);
        assert!(sel.is_empty());
    }

    #[test]
    fn test_group_collapses_shared_values() {
        let mut sel = Selection::new(
            "Users",
            vec![
                ("u1".to_string(), doc(r#"{"team": "red", "n": 1}"#)),
                ("u2".to_string(), doc(r#"{"team": "blue", "n": 2}"#)),
                ("u3".to_string(), doc(r#"{"team": "red", "n": 3}"#)),
            ],
        );
        sel.group("team").unwrap();
        assert_eq!(sel.indexes(), vec!["red", "blue"]);
        let red = sel.retrieve("red").unwrap().unwrap();
        assert_eq!(red["u1"]["n"].as_i64(), Some(1));
        assert_eq!(red["u3"]["n"].as_i64(), Some(3));
    }

    #[test]
    fn test_group_drops_entries_without_path() {
        let mut sel = Selection::new(
            "Users",
            vec![
                ("u1".to_string(), doc(r#"{"team": "red"}"#)),
                ("u2".to_string(), doc(r#"{}"#)),
            ],
        );
        sel.group("team").unwrap();
        assert_eq!(sel.indexes(), vec!["red"]);
    }

    #[test]
    fn test_group_by_non_string_value() {
        let mut sel = Selection::new(
            "Users",
            vec![
                ("u1".to_string(), doc(r#"{"level": 3}"#)),
                ("u2".to_string(), doc(r#"{"level": 3}"#)),
            ],
        );
        sel.group("level").unwrap();
        assert_eq!(sel.indexes(), vec!["3"]);
    }

    #[test]
    fn test_join_grafts_under_label() {
        let mut sel = users();
        let roles = Selection::new(
            "Roles",
            vec![("u2".to_string(), doc(r#"{"role": "admin"}"#))],
        );
        sel.join(&roles);
        let joined = sel.retrieve("u2.Roles.role").unwrap().unwrap();
        assert_eq!(joined.as_str(), Some("admin"));
        // Non-matching entries are untouched
        assert!(sel.retrieve("u1.Roles").unwrap().is_none());
    }

    #[test]
    fn test_join_skips_non_matching_rows() {
        let mut sel = users();
        let before: Vec<String> = sel
            .documents()
            .iter()
            .map(|d| d.to_json_string())
            .collect();
        let roles = Selection::new(
            "Roles",
            vec![("r1".to_string(), doc(r#"{"role": "ghost"}"#))],
        );
        sel.join(&roles);
        let after: Vec<String> = sel
            .documents()
            .iter()
            .map(|d| d.to_json_string())
            .collect();
        assert_eq!(before, after);
        assert_eq!(sel.len(), 3);
    }

    #[test]
    fn test_join_on_field_path() {
        let mut sel = users();
        let roles = Selection::new(
            "Roles",
            vec![("r1".to_string(), doc(r#"{"user": "u3", "role": "mod"}"#))],
        );
        sel.join_on(&roles, "user").unwrap();
        let joined = sel.retrieve("u3.Roles.role").unwrap().unwrap();
        assert_eq!(joined.as_str(), Some("mod"));
    }

    #[test]
    fn test_join_with_custom_strategy() {
        let mut sel = users();
        let bonus = Selection::new("Bonus", vec![("u1".to_string(), doc(r#"{"add": 5}"#))]);
        sel.join_with(&bonus, None, |mine, _, other| {
            let sum = mine["age"].as_i64().unwrap() + other["add"].as_i64().unwrap();
            mine.as_object_mut()
                .unwrap()
                .insert("age".to_string(), serde_json::json!(sum));
        })
        .unwrap();
        assert_eq!(
            sel.retrieve("u1.age").unwrap().unwrap().as_i64(),
            Some(36)
        );
    }

    #[test]
    fn test_map_replaces_in_place() {
        let mut sel = users();
        sel.map(|_, d| {
            Document::from_value(serde_json::json!({ "age_next_year": d["age"].as_i64().unwrap() + 1 }))
        });
        assert_eq!(
            sel.retrieve("u3.age_next_year").unwrap().unwrap().as_i64(),
            Some(28)
        );
    }

    #[test]
    fn test_chaining() {
        let mut sel = users();
        sel.filter(|_, d| d["age"].as_i64().unwrap() > 25)
            .order_by(|a, b| a["age"].as_i64().cmp(&b["age"].as_i64()))
            .limit(2);
        assert_eq!(sel.indexes(), vec!["u3", "u1"]);
    }
}
