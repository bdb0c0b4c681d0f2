//! Row key encoding.
//!
//! Data keys have the form `[entity name][0x00][pk component]*`. Each primary
//! key component is an i64 with its sign bit flipped, written big-endian, so
//! the lexicographic order of encoded keys matches the numeric order of the
//! key tuples and a prefix scan over one entity yields rows in key order.

use crate::error::Error;
use std::fmt;

/// Size of one encoded key component in bytes.
pub const COMPONENT_SIZE: usize = 8;

/// Separator between the entity (or relation) name and the encoded key.
const SEPARATOR: u8 = 0;

/// Prefix for sequence counters in the meta tree.
const SEQUENCE_PREFIX: &[u8] = b"seq:";

/// Primary key of a row: one integer per identity field, in key order.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(Vec<i64>);

impl RowKey {
    /// Key of a single-column primary key.
    pub fn single(value: i64) -> Self {
        Self(vec![value])
    }

    /// Key of a multi-column primary key.
    pub fn composite(values: impl IntoIterator<Item = i64>) -> Self {
        Self(values.into_iter().collect())
    }

    /// Key components in identity order.
    pub fn components(&self) -> &[i64] {
        &self.0
    }

    /// Number of key components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single component of a one-column key.
    pub fn as_single(&self) -> Option<i64> {
        match self.0.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Encode the key components.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.0.len() * COMPONENT_SIZE);
        self.encode_into(&mut buf);
        buf
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        for value in &self.0 {
            buf.extend_from_slice(&((*value as u64) ^ (1 << 63)).to_be_bytes());
        }
    }

    /// Decode key components.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() || bytes.len() % COMPONENT_SIZE != 0 {
            return Err(Error::InvalidKey);
        }
        let values = bytes
            .chunks_exact(COMPONENT_SIZE)
            .map(|chunk| {
                let mut buf = [0u8; COMPONENT_SIZE];
                buf.copy_from_slice(chunk);
                (u64::from_be_bytes(buf) ^ (1 << 63)) as i64
            })
            .collect();
        Ok(Self(values))
    }
}

impl From<i32> for RowKey {
    fn from(value: i32) -> Self {
        Self::single(i64::from(value))
    }
}

impl From<i64> for RowKey {
    fn from(value: i64) -> Self {
        Self::single(value)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [only] => write!(f, "{only}"),
            values => {
                f.write_str("(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowKey{self}")
    }
}

/// Prefix shared by all data keys of an entity.
pub fn entity_prefix(entity: &str) -> Vec<u8> {
    named_prefix(entity)
}

/// Data tree key of a row.
pub fn row_key(entity: &str, key: &RowKey) -> Vec<u8> {
    let mut buf = named_prefix(entity);
    key.encode_into(&mut buf);
    buf
}

/// Refs tree key of the posting list for rows referencing `target` through `relation`.
pub fn reference_key(relation: &str, target: &RowKey) -> Vec<u8> {
    let mut buf = named_prefix(relation);
    target.encode_into(&mut buf);
    buf
}

/// Meta tree key of an entity's sequence counter.
pub fn sequence_key(entity: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SEQUENCE_PREFIX.len() + entity.len());
    buf.extend_from_slice(SEQUENCE_PREFIX);
    buf.extend_from_slice(entity.as_bytes());
    buf
}

/// Recover the row key from a data key carrying `prefix`.
pub fn strip_prefix(prefix: &[u8], bytes: &[u8]) -> Result<RowKey, Error> {
    let rest = bytes.strip_prefix(prefix).ok_or(Error::InvalidKey)?;
    RowKey::decode(rest)
}

fn named_prefix(name: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(name.len() + 1 + COMPONENT_SIZE * 2);
    buf.extend_from_slice(name.as_bytes());
    buf.push(SEPARATOR);
    buf
}

/// Encode a posting list of row keys.
///
/// Layout: for each key, `[component count: u8][components]`.
pub fn encode_key_list(keys: &[RowKey]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(keys.iter().map(|k| 1 + k.len() * COMPONENT_SIZE).sum());
    for key in keys {
        buf.push(key.len() as u8);
        key.encode_into(&mut buf);
    }
    buf
}

/// Decode a posting list of row keys.
pub fn decode_key_list(bytes: &[u8]) -> Result<Vec<RowKey>, Error> {
    let mut keys = Vec::new();
    let mut rest = bytes;
    while let Some((&count, tail)) = rest.split_first() {
        let len = count as usize * COMPONENT_SIZE;
        if tail.len() < len {
            return Err(Error::InvalidKey);
        }
        let (key, tail) = tail.split_at(len);
        keys.push(RowKey::decode(key)?);
        rest = tail;
    }
    Ok(keys)
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
