use serde::{Deserialize, Serialize};

/// A hotel row to be indexed.
///
/// Records carry no identity of their own. A record is addressed by the
/// key its shard assigns when it is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub city: String,
    pub zip: String,
    pub country: String,
    pub address: String,
    /// `latitude,longitude` as it appears in the source.
    pub location: String,
}

impl Record {
    /// Shorthand for a record that only has a name, mostly for tests.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
