//! Record type for stored rows.

use super::Row;
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};

/// A stored row with metadata.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// Row payload as a JSON object.
    pub data: Vec<u8>,

    /// Creation timestamp in microseconds since Unix epoch.
    pub created_at: u64,

    /// Last write timestamp in microseconds since Unix epoch.
    pub updated_at: u64,
}

impl Record {
    /// Create a record for a freshly inserted row.
    pub fn new(row: &Row) -> Result<Self, Error> {
        let now = super::key::current_timestamp();
        Ok(Self {
            data: encode_row(row)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the payload, keeping the creation time.
    pub fn replaced(&self, row: &Row) -> Result<Self, Error> {
        Ok(Self {
            data: encode_row(row)?,
            created_at: self.created_at,
            updated_at: super::key::current_timestamp(),
        })
    }

    /// Decode the row payload.
    pub fn row(&self) -> Result<Row, Error> {
        serde_json::from_slice(&self.data).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

fn encode_row(row: &Row) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(row).map_err(|e| Error::Serialization(e.to_string()))
}
