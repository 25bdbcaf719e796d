//! Path specifiers and path-addressed access
//!
//! A path specifier names a root key, optionally followed by a dotted route
//! into the document stored under that key: `"u1"` addresses a whole
//! document, `"u1.profile.name"` a nested field, `"u1.items.0"` an array
//! element. [`KeyPath`] is the parsed form (root key + [`FieldPath`]); it is
//! produced by one parsing function so no component splits strings ad hoc.
//!
//! Reading walks one segment at a time and returns `None` as soon as a
//! segment is absent or a container type does not match. Writing creates
//! missing intermediate containers: an object, unless the next segment is a
//! numeric index, in which case an array. Writing through an existing
//! non-container value fails with [`Error::InvalidDocument`].

use crate::document::{value_type_name, Document};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A segment in a field path
///
/// Dotted segments made entirely of ASCII digits parse as array indexes,
/// everything else as object keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object field access
    Key(String),
    /// Array element access
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// A route into a document: an ordered list of segments
///
/// The empty path is the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The root path (no segments)
    pub fn root() -> Self {
        FieldPath {
            segments: Vec::new(),
        }
    }

    /// Build a path from parsed segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        FieldPath { segments }
    }

    /// The path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if this is the document root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Alias for [`FieldPath::is_root`]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(FieldPath::root());
        }

        let mut segments = Vec::new();
        for part in s.split('.') {
            if part.is_empty() {
                return Err(Error::PathResolution(format!("empty segment in '{}'", s)));
            }
            if part.bytes().all(|b| b.is_ascii_digit()) {
                let idx = part.parse::<usize>().map_err(|_| {
                    Error::PathResolution(format!("array index '{}' is out of range", part))
                })?;
                segments.push(PathSegment::Index(idx));
            } else {
                segments.push(PathSegment::Key(part.to_string()));
            }
        }
        Ok(FieldPath { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", seg)?;
            first = false;
        }
        Ok(())
    }
}

/// A parsed path specifier: root key plus the route inside the document
///
/// # Examples
///
/// ```
/// use docket_core::KeyPath;
///
/// let p: KeyPath = "u1.profile.name".parse().unwrap();
/// assert_eq!(p.key, "u1");
/// assert_eq!(p.path.len(), 2);
///
/// let root: KeyPath = "u1".parse().unwrap();
/// assert!(root.path.is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    /// The root key in the backing store
    pub key: String,
    /// The route inside the stored document (possibly empty)
    pub path: FieldPath,
}

impl KeyPath {
    /// Build a specifier from an already-parsed key and path
    pub fn new(key: impl Into<String>, path: FieldPath) -> Self {
        KeyPath {
            key: key.into(),
            path,
        }
    }

    /// A specifier addressing a whole document
    pub fn root(key: impl Into<String>) -> Self {
        KeyPath {
            key: key.into(),
            path: FieldPath::root(),
        }
    }

    /// True if the specifier addresses a whole document
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::PathResolution("empty path specifier".to_string()));
        }
        match s.split_once('.') {
            None => Ok(KeyPath::root(s)),
            Some((key, rest)) => {
                if key.is_empty() {
                    return Err(Error::PathResolution(format!(
                        "missing root key in '{}'",
                        s
                    )));
                }
                if rest.is_empty() {
                    return Err(Error::PathResolution(format!("empty segment in '{}'", s)));
                }
                Ok(KeyPath {
                    key: key.to_string(),
                    path: rest.parse()?,
                })
            }
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}.{}", self.key, self.path)
        }
    }
}

// =============================================================================
// Path Operations
// =============================================================================

/// Get a reference to the value at a path within a document
///
/// Returns `None` if any segment is absent or a container type does not
/// match (a key segment against an array, an index segment against an
/// object, any segment against a scalar).
pub fn get_at_path<'a>(doc: &'a Document, path: &FieldPath) -> Option<&'a serde_json::Value> {
    let mut current: &serde_json::Value = doc.as_inner();
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), serde_json::Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(idx), serde_json::Value::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Get a mutable reference to the value at a path within a document
pub fn get_at_path_mut<'a>(
    doc: &'a mut Document,
    path: &FieldPath,
) -> Option<&'a mut serde_json::Value> {
    let mut current: &mut serde_json::Value = doc.as_inner_mut();
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), serde_json::Value::Object(map)) => map.get_mut(key)?,
            (PathSegment::Index(idx), serde_json::Value::Array(arr)) => arr.get_mut(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Clone out the value at a path within a document
pub fn project_at_path(doc: &Document, path: &FieldPath) -> Option<Document> {
    get_at_path(doc, path).map(|v| Document::from_value(v.clone()))
}

/// Set the value at a path within a document
///
/// Missing intermediates are created on the way down: an object, unless the
/// next segment is an index, in which case an array. Arrays are padded with
/// nulls when an index lands past the end. A `null` intermediate counts as
/// missing and is replaced by a container. Writing through an existing
/// scalar fails with [`Error::InvalidDocument`].
///
/// A root-path write replaces the whole document; the supplied value must
/// then satisfy the root-container rule.
pub fn set_at_path(doc: &mut Document, path: &FieldPath, value: Document) -> Result<()> {
    if path.is_root() {
        value.ensure_container()?;
        *doc = value;
        return Ok(());
    }

    let segments = path.segments();
    let (last, parents) = segments.split_last().expect("non-root path has segments");

    let mut current: &mut serde_json::Value = doc.as_inner_mut();
    for (i, segment) in parents.iter().enumerate() {
        current = descend_or_create(current, segment, &segments[i + 1])?;
    }

    match last {
        PathSegment::Key(key) => match current {
            serde_json::Value::Object(map) => {
                map.insert(key.clone(), value.into_inner());
                Ok(())
            }
            other => Err(cannot_descend(other, last)),
        },
        PathSegment::Index(idx) => match current {
            serde_json::Value::Array(arr) => {
                if *idx >= arr.len() {
                    arr.resize(*idx + 1, serde_json::Value::Null);
                }
                arr[*idx] = value.into_inner();
                Ok(())
            }
            other => Err(cannot_descend(other, last)),
        },
    }
}

/// Delete the value at a path within a document
///
/// Removes an object field or array element (shifting later elements down).
/// Returns the removed value, or `None` if the path was absent. The root
/// cannot be deleted; erase the key instead.
pub fn delete_at_path(doc: &mut Document, path: &FieldPath) -> Result<Option<Document>> {
    if path.is_root() {
        return Err(Error::InvalidOperation(
            "cannot delete the document root".to_string(),
        ));
    }

    let segments = path.segments();
    let (last, parents) = segments.split_last().expect("non-root path has segments");
    let parent_path = FieldPath::from_segments(parents.to_vec());

    let parent = match get_at_path_mut(doc, &parent_path) {
        Some(p) => p,
        None => return Ok(None),
    };

    match last {
        PathSegment::Key(key) => match parent {
            serde_json::Value::Object(map) => Ok(map.remove(key).map(Document::from_value)),
            other => Err(cannot_descend(other, last)),
        },
        PathSegment::Index(idx) => match parent {
            serde_json::Value::Array(arr) => {
                if *idx < arr.len() {
                    Ok(Some(Document::from_value(arr.remove(*idx))))
                } else {
                    Ok(None)
                }
            }
            other => Err(cannot_descend(other, last)),
        },
    }
}

/// Step into `current` at `segment`, creating the slot if it is missing
///
/// `next` decides the shape of a freshly created container.
fn descend_or_create<'a>(
    current: &'a mut serde_json::Value,
    segment: &PathSegment,
    next: &PathSegment,
) -> Result<&'a mut serde_json::Value> {
    match segment {
        PathSegment::Key(key) => {
            let map = match current {
                serde_json::Value::Object(map) => map,
                other => return Err(cannot_descend(other, segment)),
            };
            let slot = map.entry(key.clone()).or_insert(serde_json::Value::Null);
            if slot.is_null() {
                *slot = empty_container_for(next);
            }
            Ok(slot)
        }
        PathSegment::Index(idx) => {
            let arr = match current {
                serde_json::Value::Array(arr) => arr,
                other => return Err(cannot_descend(other, segment)),
            };
            if *idx >= arr.len() {
                arr.resize(*idx + 1, serde_json::Value::Null);
            }
            let slot = &mut arr[*idx];
            if slot.is_null() {
                *slot = empty_container_for(next);
            }
            Ok(slot)
        }
    }
}

fn empty_container_for(next: &PathSegment) -> serde_json::Value {
    match next {
        PathSegment::Key(_) => serde_json::Value::Object(serde_json::Map::new()),
        PathSegment::Index(_) => serde_json::Value::Array(Vec::new()),
    }
}

fn cannot_descend(found: &serde_json::Value, segment: &PathSegment) -> Error {
    Error::InvalidDocument(format!(
        "cannot descend into {} at segment '{}'",
        value_type_name(found),
        segment
    ))
}
