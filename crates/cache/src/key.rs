// crates/cache/src/key.rs
use std::fmt;

/// Ordered tuple of segments identifying one cacheable query.
///
/// Two keys are the same entry iff every segment matches in order;
/// `["activities"]` and `["activities", "user-1"]` are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Single-segment key, the common case for the dashboard hooks.
    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

impl From<&str> for QueryKey {
    fn from(segment: &str) -> Self {
        Self::root(segment)
    }
}
