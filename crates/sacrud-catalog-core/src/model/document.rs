//! Schemaless parameter documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute kind holding an ordered list of values.
pub const KIND_LIST: &str = "list";

/// Attribute kind holding a set of choices.
pub const KIND_CHOICE: &str = "choice";

/// Attribute kind holding a number, usually with a metric.
pub const KIND_NUMBER: &str = "number";

/// A structured document stored as one column value.
///
/// Any JSON tree is accepted and persisted as is; the store never validates
/// what is inside. Catalog entries conventionally keep one [`ParamAttribute`]
/// per key, e.g. `{"size": {"type": "list", "value": [39, 40]}}`.
///
/// A document holding JSON `null` is stored as a null column, so an optional
/// `params` set to `Some(Document::new(Value::Null))` reads back as `None`.
/// Every other document reads back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    /// Wrap a JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// An empty object document.
    pub fn object() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// The wrapped JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Top-level entry of an object document.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a top-level entry, turning a non-object document into an object.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.into(), value);
        }
    }

    /// Read the entry `name` as a variant attribute, if it has that shape.
    pub fn attribute(&self, name: &str) -> Option<ParamAttribute> {
        self.get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Store `attribute` under `name`.
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: ParamAttribute) -> Self {
        let value = serde_json::to_value(&attribute).unwrap_or(Value::Null);
        self.insert(name, value);
        self
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.0
    }
}

/// A tagged variant attribute: `{type, value, metric?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamAttribute {
    /// Attribute kind, e.g. `list`, `choice`, `number`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Attribute value; any JSON.
    pub value: Value,
    /// Unit of a numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
}

impl ParamAttribute {
    /// Create an attribute of any kind.
    pub fn new(kind: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            metric: None,
        }
    }

    /// A `list` attribute.
    pub fn list(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::new(KIND_LIST, values.into_iter().map(Into::into).collect::<Vec<Value>>())
    }

    /// A `choice` attribute.
    pub fn choice(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::new(KIND_CHOICE, values.into_iter().map(Into::into).collect::<Vec<Value>>())
    }

    /// A `number` attribute.
    pub fn number(value: impl Into<Value>) -> Self {
        Self::new(KIND_NUMBER, value)
    }

    /// Set the unit.
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }
}
