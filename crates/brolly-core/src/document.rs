//! Documents — schemaless key-to-fields records grouped into collections.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// The field map of a document. Values are plain JSON.
pub type Fields = Map<String, Value>;

/// A stored document: its key within a collection plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub key:    String,
  pub fields: Fields,
}

impl Document {
  pub fn new(key: impl Into<String>, fields: Fields) -> Self {
    Self { key: key.into(), fields }
  }

  /// Look up a single field.
  pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }

  /// Deserialise the fields into a typed value.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
  }
}

/// Serialise a typed value into a field map.
///
/// Fails with [`Error::InvalidSchema`] if the value does not serialise to a
/// JSON object.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> Result<Fields> {
  match serde_json::to_value(value)? {
    Value::Object(map) => Ok(map),
    other => Err(Error::InvalidSchema(format!(
      "expected an object, got {}",
      json_type_name(&other)
    ))),
  }
}

/// Human-readable JSON type name, used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
