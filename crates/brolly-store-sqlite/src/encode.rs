//! Conversions between JSON field maps and SQLite values.
//!
//! Documents are stored as compact JSON text. Filters are evaluated with
//! `json_extract`, so filter operands are bound as native SQLite values of the
//! matching type.

use brolly_core::document::{Document, Fields};
use rusqlite::types::{Type, Value as SqlValue};
use serde_json::Value;

/// The `json_extract` path for a top-level field.
pub fn field_path(field: &str) -> String {
  format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// Bind a JSON scalar the way `json_extract` would return it.
pub fn sql_value(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    other => SqlValue::Text(other.to_string()),
  }
}

/// The `json_type` values a stored field must have to be compared with
/// `value`, as an SQL list. Mirrors `Filter::matches`: only same-typed
/// scalars compare, so non-scalar operands match nothing.
pub fn comparable_types(value: &Value) -> Option<&'static str> {
  match value {
    Value::Bool(_) => Some("('true', 'false')"),
    Value::Number(_) => Some("('integer', 'real')"),
    Value::String(_) => Some("('text')"),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  }
}

pub fn encode_fields(fields: &Fields) -> String { Value::Object(fields.clone()).to_string() }

/// Parse a stored `fields` column. Runs on the database thread, so errors are
/// reported as rusqlite conversion failures.
pub fn decode_fields(raw: &str) -> rusqlite::Result<Fields> {
  serde_json::from_str(raw)
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// A `(key, fields)` row as read from the `documents` table.
pub struct RawDocument {
  pub key:    String,
  pub fields: String,
}

impl RawDocument {
  pub fn into_document(self) -> rusqlite::Result<Document> {
    Ok(Document::new(self.key, decode_fields(&self.fields)?))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn scalars_bind_as_native_types() {
    assert_eq!(sql_value(&json!(true)), SqlValue::Integer(1));
    assert_eq!(sql_value(&json!(7)), SqlValue::Integer(7));
    assert_eq!(sql_value(&json!(7.5)), SqlValue::Real(7.5));
    assert_eq!(sql_value(&json!("London")), SqlValue::Text("London".into()));
    assert_eq!(sql_value(&Value::Null), SqlValue::Null);
  }

  #[test]
  fn only_scalars_are_comparable() {
    assert_eq!(comparable_types(&json!(3)), Some("('integer', 'real')"));
    assert_eq!(comparable_types(&json!("London")), Some("('text')"));
    assert_eq!(comparable_types(&json!(false)), Some("('true', 'false')"));
    assert_eq!(comparable_types(&json!([1])), None);
    assert_eq!(comparable_types(&Value::Null), None);
  }

  #[test]
  fn field_paths_are_quoted() {
    assert_eq!(field_path("mean_temp"), "$.\"mean_temp\"");
  }
}
