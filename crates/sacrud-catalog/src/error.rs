//! Database error types.

use sacrud_catalog_core::IntegrityKind;
use thiserror::Error;

/// Errors returned by the catalog database.
#[derive(Debug, Error)]
pub enum Error {
    /// Store, schema or integrity error.
    #[error(transparent)]
    Core(#[from] sacrud_catalog_core::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Log subscriber could not be installed.
    #[error("logging error: {0}")]
    Logging(String),
}

impl Error {
    /// The integrity category of a rejected write, if that is what this is.
    pub fn integrity_kind(&self) -> Option<IntegrityKind> {
        match self {
            Error::Core(e) => e.integrity_kind(),
            _ => None,
        }
    }

    /// Whether the addressed row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_not_found())
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use sacrud_catalog_core::{ConstraintError, RowKey};

    #[test]
    fn test_integrity_kind_passes_through() {
        let err: Error = sacrud_catalog_core::Error::from(ConstraintError::NullViolation {
            entity: "Product".into(),
            field: "name".into(),
        })
        .into();

        assert_eq!(err.integrity_kind(), Some(IntegrityKind::Null));
        assert!(err.to_string().contains("name"));
        assert_eq!(Error::Config("x".into()).integrity_kind(), None);
    }

    #[test]
    fn test_not_found() {
        let err: Error = sacrud_catalog_core::Error::NotFound {
            entity: "Stock".into(),
            key: RowKey::single(4),
        }
        .into();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Stock row 4 not found");
    }
}
