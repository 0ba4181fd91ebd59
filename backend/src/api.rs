//! Shared identifier types for the HTTP API and the storage layer.
//!
//! Every stored record is keyed by a [`DocumentId`]: 12 bytes rendered as 24
//! lowercase hex characters, wire-compatible with MongoDB ObjectIds.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Document identifier (database primary key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId([u8; 12]);

/// Error returned when a string is not a valid [`DocumentId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid document id: {0:?}")]
pub struct InvalidDocumentId(pub String);

impl DocumentId {
    /// Generate a fresh identifier.
    ///
    /// The first four bytes hold the current Unix timestamp (big-endian) so
    /// identifiers sort roughly by creation time; the rest are random.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&uuid::Uuid::new_v4().as_bytes()[..8]);
        DocumentId(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        DocumentId(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse a 24-character hex string.
    pub fn parse_str(value: &str) -> Result<Self, InvalidDocumentId> {
        if value.len() != 24 {
            return Err(InvalidDocumentId(value.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(value, &mut bytes)
            .map_err(|_| InvalidDocumentId(value.to_string()))?;
        Ok(DocumentId(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = InvalidDocumentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::parse_str(s)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DocumentId::parse_str(&raw).map_err(serde::de::Error::custom)
    }
}
