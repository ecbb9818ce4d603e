use std::fmt;
use std::str::FromStr;

use ::cid::Cid;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// A validated IPFS content identifier (CIDv0 `Qm…` or CIDv1 `b…`).
///
/// Ledger rows carry the identifier as a free-form string; parsing it here
/// keeps malformed values out of gateway URLs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobCid(Cid);

impl BlobCid {
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StorageError::InvalidCid("empty identifier".into()));
        }
        Cid::try_from(s)
            .map(Self)
            .map_err(|e| StorageError::InvalidCid(format!("{s}: {e}")))
    }

    /// CID version (0 or 1).
    pub fn version(&self) -> u64 {
        self.0.version().into()
    }

    pub fn as_cid(&self) -> &Cid {
        &self.0
    }
}

impl From<Cid> for BlobCid {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl FromStr for BlobCid {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for BlobCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobCid({})", self.0)
    }
}

impl fmt::Display for BlobCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for BlobCid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for BlobCid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
