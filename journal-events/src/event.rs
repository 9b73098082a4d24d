//! Event definitions

use crate::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Typed string-keyed attribute map.
///
/// Used for event attributes, listener predicates, and listener static
/// metadata. Values are compared structurally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

static EMPTY_ATTRIBUTES: Attributes = Attributes(BTreeMap::new());

impl Attributes {
    /// Create an empty attribute map
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Shared empty map, returned by listeners without a predicate.
    pub fn empty() -> &'static Attributes {
        &EMPTY_ATTRIBUTES
    }

    /// Add an attribute (builder style)
    ///
    /// # Examples
    ///
    /// ```
    /// use journal_events::Attributes;
    ///
    /// let attrs = Attributes::new().with("severity", "high").with("count", 3);
    /// assert_eq!(attrs.get_str("severity"), Some("high"));
    /// assert_eq!(attrs.len(), 2);
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get an attribute if it holds a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Whether every entry of `predicate` is present here with an equal value.
    ///
    /// Extra keys in `self` are ignored; an empty predicate always matches.
    pub fn matches(&self, predicate: &Attributes) -> bool {
        predicate
            .0
            .iter()
            .all(|(key, expected)| self.0.get(key) == Some(expected))
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Opaque reference to whoever an event concerns (a guild, tenant, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Subject {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Subject {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for Subject {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A single published occurrence.
///
/// Events are created by [`Router::send`](crate::Router::send), consumed
/// once by the dispatch loop and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID, for log correlation
    pub id: Uuid,

    /// Topic the event was sent on
    pub path: Path,

    /// Who the event concerns
    pub subject: Subject,

    /// Human-readable content; replaced by the processed form before fan-out
    pub content: String,

    /// Event attributes matched against listener predicates
    pub attributes: Attributes,

    /// Timestamp when the event was created
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a new event
    pub fn new(
        path: impl Into<Path>,
        subject: impl Into<Subject>,
        content: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            subject: subject.into(),
            content: content.into(),
            attributes,
            timestamp: Utc::now(),
        }
    }

    /// Replace the content, keeping identity and attributes
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}
