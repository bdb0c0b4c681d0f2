//! Transactional view over the storage trees.
//!
//! Every mutation of the store runs inside one sled transaction spanning the
//! data, meta and refs trees. sled may retry the transaction closure on
//! conflict, so everything executed through a [`TxView`] must be free of
//! side effects outside the transaction.

use super::key::{decode_key_list, encode_key_list, reference_key, row_key, sequence_key};
use super::{Record, Row, RowKey};
use crate::error::Error;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};

/// Result type of work done inside a transaction.
pub type TxResult<T> = Result<T, ConflictableTransactionError<Error>>;

/// Abort the running transaction with `error`.
pub fn abort<T>(error: impl Into<Error>) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(error.into()))
}

/// Map the outcome of a sled transaction back to a core result.
pub(crate) fn finish<T>(result: Result<T, TransactionError<Error>>) -> Result<T, Error> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
    }
}

/// Row, sequence and reference access within a transaction.
pub struct TxView<'a> {
    data: &'a TransactionalTree,
    meta: &'a TransactionalTree,
    refs: &'a TransactionalTree,
}

impl<'a> TxView<'a> {
    pub(crate) fn new(
        data: &'a TransactionalTree,
        meta: &'a TransactionalTree,
        refs: &'a TransactionalTree,
    ) -> Self {
        Self { data, meta, refs }
    }

    /// Read the stored record of a row.
    pub fn read_record(&self, entity: &str, key: &RowKey) -> TxResult<Option<Record>> {
        match self.data.get(row_key(entity, key))? {
            Some(bytes) => Record::from_bytes(&bytes)
                .map(Some)
                .map_err(ConflictableTransactionError::Abort),
            None => Ok(None),
        }
    }

    /// Read the payload of a row.
    pub fn read_row(&self, entity: &str, key: &RowKey) -> TxResult<Option<Row>> {
        match self.read_record(entity, key)? {
            Some(record) => record
                .row()
                .map(Some)
                .map_err(ConflictableTransactionError::Abort),
            None => Ok(None),
        }
    }

    /// Check whether a row exists.
    pub fn contains(&self, entity: &str, key: &RowKey) -> TxResult<bool> {
        Ok(self.data.get(row_key(entity, key))?.is_some())
    }

    /// Store a record under the row key.
    pub fn write_record(&self, entity: &str, key: &RowKey, record: &Record) -> TxResult<()> {
        let bytes = record
            .to_bytes()
            .map_err(ConflictableTransactionError::Abort)?;
        self.data.insert(row_key(entity, key), bytes)?;
        Ok(())
    }

    /// Remove a row.
    pub fn remove_row(&self, entity: &str, key: &RowKey) -> TxResult<()> {
        self.data.remove(row_key(entity, key))?;
        Ok(())
    }

    /// Hand out the next value of an entity's sequence, starting at 1.
    pub fn next_sequence(&self, entity: &str) -> TxResult<i64> {
        let next = self.sequence(entity)? + 1;
        self.meta.insert(sequence_key(entity), &next.to_be_bytes()[..])?;
        Ok(next)
    }

    /// Move an entity's sequence forward so it never hands out `used` again.
    pub fn advance_sequence(&self, entity: &str, used: i64) -> TxResult<()> {
        if used > self.sequence(entity)? {
            self.meta.insert(sequence_key(entity), &used.to_be_bytes()[..])?;
        }
        Ok(())
    }

    fn sequence(&self, entity: &str) -> TxResult<i64> {
        match self.meta.get(sequence_key(entity))? {
            Some(bytes) => decode_counter(&bytes).map_err(ConflictableTransactionError::Abort),
            None => Ok(0),
        }
    }

    /// Keys of the rows referencing `target` through `relation`, in key order.
    pub fn references(&self, relation: &str, target: &RowKey) -> TxResult<Vec<RowKey>> {
        match self.refs.get(reference_key(relation, target))? {
            Some(bytes) => decode_key_list(&bytes).map_err(ConflictableTransactionError::Abort),
            None => Ok(Vec::new()),
        }
    }

    /// Record that `source` references `target` through `relation`.
    pub fn add_reference(&self, relation: &str, target: &RowKey, source: &RowKey) -> TxResult<()> {
        let mut keys = self.references(relation, target)?;
        if let Err(pos) = keys.binary_search(source) {
            keys.insert(pos, source.clone());
            self.store_references(relation, target, &keys)?;
        }
        Ok(())
    }

    /// Forget that `source` references `target` through `relation`.
    pub fn remove_reference(
        &self,
        relation: &str,
        target: &RowKey,
        source: &RowKey,
    ) -> TxResult<()> {
        let mut keys = self.references(relation, target)?;
        if let Ok(pos) = keys.binary_search(source) {
            keys.remove(pos);
            self.store_references(relation, target, &keys)?;
        }
        Ok(())
    }

    /// Drop the whole posting list of `target` for `relation`.
    pub fn clear_references(&self, relation: &str, target: &RowKey) -> TxResult<()> {
        self.refs.remove(reference_key(relation, target))?;
        Ok(())
    }

    fn store_references(&self, relation: &str, target: &RowKey, keys: &[RowKey]) -> TxResult<()> {
        let key = reference_key(relation, target);
        if keys.is_empty() {
            self.refs.remove(key)?;
        } else {
            self.refs.insert(key, encode_key_list(keys))?;
        }
        Ok(())
    }
}

fn decode_counter(bytes: &[u8]) -> Result<i64, Error> {
    let buf: [u8; 8] = bytes.try_into().map_err(|_| Error::InvalidKey)?;
    Ok(i64::from_be_bytes(buf))
}
