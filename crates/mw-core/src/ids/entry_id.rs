use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifier of a library entry.
///
/// On the remote store this is the JSON filename stem under `data/entries/`.
/// The local cache keys rows by the integer form of the same value, so an id
/// is only cacheable when it parses as an `i64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn from_cache_key(key: i64) -> Self {
        EntryId(key.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Integer cache key for this id, `None` when the id is not numeric.
    ///
    /// Only ids whose integer form stringifies back to the same text are
    /// accepted (`"007"` and `"+7"` are rejected) so that the cache key and
    /// the remote filename always round-trip.
    pub fn cache_key(&self) -> Option<i64> {
        let key = self.0.parse::<i64>().ok()?;
        (key.to_string() == self.0).then_some(key)
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        EntryId(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

impl AsRef<str> for EntryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
