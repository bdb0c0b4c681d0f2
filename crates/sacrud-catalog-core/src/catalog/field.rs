//! Column declarations.

use rkyv::{Archive, Deserialize, Serialize};
use serde_json::{Number, Value};

use super::types::{FieldType, ScalarType};

/// One column of an entity.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Column type.
    pub field_type: FieldType,
    /// Rejected with a null-violation when absent or null.
    pub required: bool,
    /// Value written when the payload leaves the column out.
    pub default: Option<DefaultValue>,
    /// Rendered as a `CREATE INDEX` in DDL.
    pub indexed: bool,
}

/// Column default.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum DefaultValue {
    /// `NULL`.
    Null,
    /// Boolean constant.
    Bool(bool),
    /// Integer constant.
    Int(i64),
    /// Float constant.
    Float(f64),
    /// String constant.
    String(String),
    /// Next value of the entity sequence.
    Sequence,
}

impl DefaultValue {
    /// The constant written for this default; `None` for sequences.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            DefaultValue::Null => Some(Value::Null),
            DefaultValue::Bool(b) => Some(Value::Bool(*b)),
            DefaultValue::Int(i) => Some(Value::from(*i)),
            DefaultValue::Float(f) => Number::from_f64(*f).map(Value::Number),
            DefaultValue::String(s) => Some(Value::String(s.clone())),
            DefaultValue::Sequence => None,
        }
    }
}

impl FieldDef {
    /// A required column.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            default: None,
            indexed: false,
        }
    }

    /// A column that may be left out or set to null.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::new(name, field_type)
        }
    }

    /// A nullable scalar column.
    pub fn optional_scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::optional(name, FieldType::OptionalScalar(scalar))
    }

    /// A nullable document column.
    pub fn document(name: impl Into<String>) -> Self {
        Self::optional(name, FieldType::OptionalDocument)
    }

    /// A serial key: `INTEGER`, assigned from the entity sequence when absent.
    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::scalar(ScalarType::Int32)).with_default(DefaultValue::Sequence)
    }

    /// Set the default.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Request an index on this column.
    pub fn with_index(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Whether the column is filled from the entity sequence.
    pub fn is_serial(&self) -> bool {
        matches!(self.default, Some(DefaultValue::Sequence))
    }
}
