//! Core error types.

use thiserror::Error;

use crate::storage::RowKey;

/// Core catalog errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Row not found.
    #[error("{entity} row {key} not found")]
    NotFound {
        /// Entity that was looked up.
        entity: String,
        /// Primary key that was looked up.
        key: RowKey,
    },

    /// Entity is not declared in the schema.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Schema definition is inconsistent.
    #[error("schema error: {0}")]
    Schema(String),

    /// An integrity constraint rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[from] ConstraintError),

    /// Cascade processing failed.
    #[error("cascade error: {0}")]
    Cascade(#[from] CascadeError),
}

/// Category of an integrity failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityKind {
    /// A required field was missing or null.
    Null,
    /// A foreign key pointed nowhere, or a delete would leave one dangling.
    Referential,
    /// A primary or unique key was already taken.
    Uniqueness,
}

/// Integrity constraint violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// Required field missing or null.
    #[error("null value in field '{field}' of {entity} violates not-null constraint")]
    NullViolation {
        /// Entity being written.
        entity: String,
        /// Field that was missing.
        field: String,
    },

    /// Foreign key value with no referenced row.
    #[error(
        "{entity}.{field} = {value} violates foreign key '{constraint}': no such {references_entity}"
    )]
    ForeignKeyViolation {
        /// Constraint name.
        constraint: String,
        /// Entity being written.
        entity: String,
        /// Foreign key field.
        field: String,
        /// Entity the key should point at.
        references_entity: String,
        /// Offending value.
        value: i64,
    },

    /// Delete refused because other rows still reference the target.
    #[error(
        "cannot delete {entity}: {count} {referencing_entity} row(s) still reference it through '{relation}'"
    )]
    RestrictViolation {
        /// Relation that restricts the delete.
        relation: String,
        /// Entity being deleted.
        entity: String,
        /// Entity holding the references.
        referencing_entity: String,
        /// Number of referencing rows.
        count: usize,
    },

    /// Primary or unique key already present.
    #[error("duplicate key {key} in {entity} violates unique constraint '{constraint}'")]
    UniqueViolation {
        /// Constraint name.
        constraint: String,
        /// Entity being written.
        entity: String,
        /// Duplicate key.
        key: RowKey,
    },
}

impl ConstraintError {
    /// The integrity category of this violation.
    pub fn kind(&self) -> IntegrityKind {
        match self {
            ConstraintError::NullViolation { .. } => IntegrityKind::Null,
            ConstraintError::ForeignKeyViolation { .. }
            | ConstraintError::RestrictViolation { .. } => IntegrityKind::Referential,
            ConstraintError::UniqueViolation { .. } => IntegrityKind::Uniqueness,
        }
    }
}

/// Cascade processing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CascadeError {
    /// Cascade chain deeper than the configured limit.
    #[error("cascade depth {depth} exceeds the maximum")]
    MaxDepthExceeded {
        /// Depth reached.
        depth: usize,
    },
}

impl Error {
    /// Integrity category, if this error is a constraint violation.
    pub fn integrity_kind(&self) -> Option<IntegrityKind> {
        match self {
            Error::ConstraintViolation(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Whether this error reports a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
