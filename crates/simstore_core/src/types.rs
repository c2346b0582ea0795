//! Core type definitions for the engine.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of a data record, user or group.
///
/// Rendered as `"<sequence>.<version>"`. The version is always `1` for ids
/// minted by the engine; it is kept only for format compatibility.
///
/// Ordering is numeric on the sequence, so maps keyed by `RecordId` iterate
/// in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    seq: u64,
    version: u32,
}

impl RecordId {
    /// Creates an id for the given sequence value.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self { seq, version: 1 }
    }

    /// Returns the sequence part.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the version suffix.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.seq, self.version)
    }
}

/// Error returned when parsing a malformed [`RecordId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecordIdError(String);

impl fmt::Display for ParseRecordIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid record id: {:?}", self.0)
    }
}

impl std::error::Error for ParseRecordIdError {}

impl FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRecordIdError(s.to_string());
        let (seq, version) = s.split_once('.').ok_or_else(err)?;
        Ok(Self {
            seq: seq.parse().map_err(|_| err())?,
            version: version.parse().map_err(|_| err())?,
        })
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of object a store, property or reference applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Data records.
    Data,
    /// Users (and their groups).
    User,
    /// Project-wide values.
    Project,
}

impl ObjectKind {
    /// Lowercase name used in snapshots and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::User => "user",
            Self::Project => "project",
        }
    }

    /// Capitalized directory name used in project layouts and asset paths.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Data => "Data",
            Self::User => "User",
            Self::Project => "Project",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity kinds with their own id sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Data records (shared by every data store).
    DataRecord,
    /// Users (shared by every user store).
    User,
    /// User groups.
    Group,
}
