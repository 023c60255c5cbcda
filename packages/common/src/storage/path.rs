use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Relative, sharded location of a stored file: `{2 hex chars}/{30 hex chars}`.
///
/// Paths are generated from a v4 UUID, so they are unpredictable. The path
/// is the only reference to the bytes on disk and effectively acts as an
/// access token, which is why it must never be derivable from the upload.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StoredPath(String);

impl StoredPath {
    /// Generate a fresh unpredictable path.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{}/{}", &hex[..2], &hex[2..]))
    }

    /// Parse a path previously produced by [`StoredPath::generate`].
    ///
    /// Rejects anything that is not exactly the sharded lowercase-hex shape,
    /// so values loaded from the database can never traverse outside the
    /// store's base directory.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        let Some((shard, rest)) = s.split_once('/') else {
            return Err(StorageError::InvalidPath(s.to_string()));
        };
        let valid = shard.len() == 2
            && rest.len() == 30
            && shard.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
            && rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        if !valid {
            return Err(StorageError::InvalidPath(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoredPath({})", self.0)
    }
}

impl fmt::Display for StoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StoredPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StoredPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_round_trips_through_parse() {
        let path = StoredPath::generate();
        let parsed = StoredPath::parse(path.as_str()).unwrap();
        assert_eq!(path, parsed);
    }

    #[test]
    fn generated_paths_are_unique() {
        let a = StoredPath::generate();
        let b = StoredPath::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_traversal_and_junk() {
        for bad in [
            "",
            "..",
            "../etc/passwd",
            "ab/../cd",
            "ab",
            "ab/short",
            "AB/0123456789abcdef0123456789abcd",
            "ab/0123456789abcdef0123456789abcZ",
            "abc/123456789abcdef0123456789abcd",
            "ab/0123456789abcdef0123456789abcd/x",
        ] {
            assert!(StoredPath::parse(bad).is_err(), "accepted {bad:?}");
        }
    }
}
