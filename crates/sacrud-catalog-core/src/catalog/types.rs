//! Column types.

use rkyv::{Archive, Deserialize, Serialize};
use serde_json::Value;

/// Scalar column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum ScalarType {
    /// `BOOLEAN`.
    Bool,
    /// `INTEGER`; also the type of serial keys.
    Int32,
    /// `BIGINT`.
    Int64,
    /// `DOUBLE PRECISION`.
    Float64,
    /// `VARCHAR`.
    String,
}

impl ScalarType {
    /// Whether values of this type can form a row key.
    pub fn is_integer(self) -> bool {
        matches!(self, ScalarType::Int32 | ScalarType::Int64)
    }

    /// PostgreSQL spelling of the type.
    pub fn sql_name(self) -> &'static str {
        match self {
            ScalarType::Bool => "BOOLEAN",
            ScalarType::Int32 => "INTEGER",
            ScalarType::Int64 => "BIGINT",
            ScalarType::Float64 => "DOUBLE PRECISION",
            ScalarType::String => "VARCHAR",
        }
    }

    /// Whether a JSON value fits this type. Integers must fit the column width.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (ScalarType::Bool, Value::Bool(_)) => true,
            (ScalarType::Int32, Value::Number(n)) => {
                n.as_i64().is_some_and(|v| i32::try_from(v).is_ok())
            }
            (ScalarType::Int64, Value::Number(n)) => n.as_i64().is_some(),
            (ScalarType::Float64, Value::Number(_)) => true,
            (ScalarType::String, Value::String(_)) => true,
            _ => false,
        }
    }
}

/// Type of one column.
///
/// A document column holds any JSON tree and is persisted as one value;
/// nothing inside it is checked.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum FieldType {
    /// Non-null scalar.
    Scalar(ScalarType),
    /// Nullable scalar.
    OptionalScalar(ScalarType),
    /// Non-null document.
    Document,
    /// Nullable document.
    OptionalDocument,
}

impl FieldType {
    /// A non-null scalar column type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Whether the column admits null.
    pub fn is_nullable(&self) -> bool {
        matches!(self, FieldType::OptionalScalar(_) | FieldType::OptionalDocument)
    }

    /// Whether the column holds a document.
    pub fn is_document(&self) -> bool {
        matches!(self, FieldType::Document | FieldType::OptionalDocument)
    }

    /// The scalar underneath, for scalar columns.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) => Some(*s),
            FieldType::Document | FieldType::OptionalDocument => None,
        }
    }

    /// PostgreSQL spelling of the column type.
    pub fn sql_name(&self) -> &'static str {
        match self.scalar_type() {
            Some(scalar) => scalar.sql_name(),
            None => "JSONB",
        }
    }

    /// Whether a non-null JSON value fits the column.
    pub fn accepts(&self, value: &Value) -> bool {
        self.scalar_type().map_or(true, |s| s.accepts(value))
    }
}
