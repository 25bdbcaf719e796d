//! Document values
//!
//! A [`Document`] is the unit of storage: an arbitrary JSON tree identified
//! by a root key. The root-level value stored under a key must itself be a
//! container (object or array), never a bare scalar, because nested-path
//! writes need a mutable container to descend into.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// A JSON document
///
/// Newtype around `serde_json::Value` providing:
/// - Direct access to the underlying value via `Deref`/`DerefMut`
/// - Easy construction from common types
/// - The root-container rule ([`Document::ensure_container`])
///
/// # Examples
///
/// ```
/// use docket_core::Document;
///
/// let obj = Document::object();
/// let arr = Document::array();
/// assert!(obj.is_object());
/// assert!(arr.is_array());
///
/// let n = Document::from(42i64);
/// assert_eq!(n.as_i64(), Some(42));
/// assert!(n.ensure_container().is_err()); // scalars cannot be stored at the root
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(serde_json::Value);

impl Document {
    /// Create a null document value
    pub fn null() -> Self {
        Document(serde_json::Value::Null)
    }

    /// Create an empty object
    pub fn object() -> Self {
        Document(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Create an empty array
    pub fn array() -> Self {
        Document(serde_json::Value::Array(Vec::new()))
    }

    /// Wrap a `serde_json::Value`
    pub fn from_value(value: serde_json::Value) -> Self {
        Document(value)
    }

    /// Unwrap into the underlying `serde_json::Value`
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }

    /// Borrow the underlying `serde_json::Value`
    pub fn as_inner(&self) -> &serde_json::Value {
        &self.0
    }

    /// Mutably borrow the underlying `serde_json::Value`
    pub fn as_inner_mut(&mut self) -> &mut serde_json::Value {
        &mut self.0
    }

    /// True if the value is an object or array
    pub fn is_container(&self) -> bool {
        self.0.is_object() || self.0.is_array()
    }

    /// Enforce the root-container rule
    ///
    /// Every value stored at the root of a key must be a container so that
    /// nested-path writes have something to descend into.
    pub fn ensure_container(&self) -> Result<()> {
        if self.is_container() {
            Ok(())
        } else {
            Err(Error::InvalidDocument(format!(
                "root value must be an object or array, found {}",
                value_type_name(&self.0)
            )))
        }
    }

    /// Serialize to a compact JSON string
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }
}

/// Type name of a JSON value, for error messages
pub fn value_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = serde_json::from_str(s)?;
        Ok(Document(value))
    }
}

impl Deref for Document {
    type Target = serde_json::Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// An absent root materializes as an empty object
impl Default for Document {
    fn default() -> Self {
        Self::object()
    }
}

impl From<serde_json::Value> for Document {
    fn from(v: serde_json::Value) -> Self {
        Document(v)
    }
}

impl From<Document> for serde_json::Value {
    fn from(v: Document) -> Self {
        v.0
    }
}

impl From<bool> for Document {
    fn from(v: bool) -> Self {
        Document(serde_json::Value::Bool(v))
    }
}

impl From<i64> for Document {
    fn from(v: i64) -> Self {
        Document(serde_json::Value::Number(v.into()))
    }
}

impl From<i32> for Document {
    fn from(v: i32) -> Self {
        Document(serde_json::Value::Number(v.into()))
    }
}

impl From<u64> for Document {
    fn from(v: u64) -> Self {
        Document(serde_json::Value::Number(v.into()))
    }
}

impl From<f64> for Document {
    fn from(v: f64) -> Self {
        Document(
            serde_json::Number::from_f64(v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
        )
    }
}

impl From<&str> for Document {
    fn from(v: &str) -> Self {
        Document(serde_json::Value::String(v.to_string()))
    }
}

impl From<String> for Document {
    fn from(v: String) -> Self {
        Document(serde_json::Value::String(v))
    }
}

impl<T: Into<Document>> From<Vec<T>> for Document {
    fn from(v: Vec<T>) -> Self {
        Document(serde_json::Value::Array(
            v.into_iter().map(|x| x.into().0).collect(),
        ))
    }
}
