//! Peer identity
//!
//! Peers are identified by a short textual tag. Scenario code mostly uses the
//! single letters 'A'..'Z', but any non-empty string works; two ids with the
//! same tag are equal, and ordering is total (lexicographic on the tag).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a peer in the mesh
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer id from a tag (a `char`, `&str`, or `String`)
    pub fn new(tag: impl Into<PeerId>) -> Self {
        tag.into()
    }

    /// Generate all single-letter ids from 'A' to the given letter (inclusive)
    ///
    /// Non-uppercase endpoints yield an empty sequence.
    pub fn range_to(end: char) -> Vec<Self> {
        ('A'..=end)
            .filter(|c| c.is_ascii_uppercase())
            .map(Self::from)
            .collect()
    }

    /// The underlying tag
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<char> for PeerId {
    fn from(c: char) -> Self {
        Self(c.to_string())
    }
}

impl From<&str> for PeerId {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for PeerId {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
