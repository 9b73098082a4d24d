//! Hierarchical event paths

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Slash-delimited topic identifier such as `/settings/roles/member`.
///
/// A path is an immutable sequence of segments. Two paths are equal when
/// their segment sequences are equal; no case folding or other
/// normalization is applied beyond dropping empty segments while parsing.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Arc<[String]>,
}

impl Path {
    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            segments: Arc::from(Vec::<String>::new()),
        }
    }

    /// Build a path from already-split segments.
    ///
    /// Empty segments are skipped so that `["a", "", "b"]` and `["a", "b"]`
    /// name the same path.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            segments: Arc::from(segments),
        }
    }

    /// Parse a slash-delimited string. A leading slash is optional.
    ///
    /// # Examples
    ///
    /// ```
    /// use journal_events::Path;
    ///
    /// let path = Path::parse("/settings/roles");
    /// assert_eq!(path.segments(), ["settings", "roles"]);
    /// assert_eq!(path.to_string(), "/settings/roles");
    /// ```
    pub fn parse(s: &str) -> Self {
        Self::new(s.split('/'))
    }

    /// Path components in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; the root has zero.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Same as [`is_root`](Path::is_root); pairs with [`len`](Path::len).
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// Whether this is `/`, the ancestor of every path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Immediate parent, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        Some(self.prefix(self.segments.len() - 1))
    }

    /// Ancestors of this path, nearest first, ending with the root.
    ///
    /// The path itself is never yielded, and the root has no parents.
    ///
    /// # Examples
    ///
    /// ```
    /// use journal_events::Path;
    ///
    /// let parents: Vec<String> = Path::parse("/a/b/c")
    ///     .parents()
    ///     .map(|p| p.to_string())
    ///     .collect();
    /// assert_eq!(parents, ["/a/b", "/a", "/"]);
    /// ```
    pub fn parents(&self) -> Parents {
        Parents {
            path: self.clone(),
            remaining: self.segments.len(),
        }
    }

    /// Append a relative path below this one.
    pub fn join(&self, relative: impl AsRef<str>) -> Path {
        let mut segments = self.segments.to_vec();
        segments.extend(
            relative
                .as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        Self {
            segments: Arc::from(segments),
        }
    }

    /// Whether `ancestor` is this path or one of its parents.
    pub fn starts_with(&self, ancestor: &Path) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    fn prefix(&self, len: usize) -> Path {
        Self {
            segments: Arc::from(&self.segments[..len]),
        }
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in self.segments.iter() {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self)
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Iterator over the ancestors of a [`Path`], nearest first.
///
/// A clone continues from the same position independently; call
/// [`Path::parents`] again for a fresh pass.
#[derive(Debug, Clone)]
pub struct Parents {
    path: Path,
    remaining: usize,
}

impl Iterator for Parents {
    type Item = Path;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.path.prefix(self.remaining))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Parents {}
