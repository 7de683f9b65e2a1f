//! Schema validation run before any write reaches the store.
//!
//! Validators work on raw field maps rather than typed values so that absent
//! fields and wrongly-typed values can be reported precisely. They never
//! touch the store.

use chrono::NaiveDate;
use serde_json::Value;
use strum::VariantNames as _;

use crate::{
  Error, Result, collection,
  document::{Fields, json_type_name},
  prefs::TemperatureUnit,
};

const PREFERENCE_REQUIRED: &[&str] = &["favorite_locations", "temperature_unit"];
const WEATHER_EVENT_REQUIRED: &[&str] = &["temperature", "humidity", "conditions"];

fn invalid(msg: impl Into<String>) -> Error { Error::InvalidSchema(msg.into()) }

fn require_fields(fields: &Fields, required: &[&str]) -> Result<()> {
  let missing: Vec<&str> = required
    .iter()
    .copied()
    .filter(|f| !fields.contains_key(*f))
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(invalid(format!("missing required fields: {}", missing.join(", "))))
  }
}

fn check_locations(value: &Value) -> Result<()> {
  let Value::Array(items) = value else {
    return Err(invalid(format!(
      "favorite_locations must be a list, got {}",
      json_type_name(value)
    )));
  };
  match items.iter().find(|item| !item.is_string()) {
    None => Ok(()),
    Some(item) => Err(invalid(format!(
      "favorite_locations must contain strings, got {}",
      json_type_name(item)
    ))),
  }
}

fn check_notifications(value: Option<&Value>) -> Result<()> {
  match value {
    None | Some(Value::Bool(_)) | Some(Value::Null) => Ok(()),
    Some(other) => Err(invalid(format!(
      "notification_enabled must be a boolean, got {}",
      json_type_name(other)
    ))),
  }
}

fn check_unit(value: &Value) -> Result<()> {
  let valid = value
    .as_str()
    .is_some_and(|s| TemperatureUnit::VARIANTS.contains(&s));
  if valid {
    Ok(())
  } else {
    Err(invalid(format!(
      "temperature_unit must be one of {:?}, got {value}",
      TemperatureUnit::VARIANTS
    )))
  }
}

/// Validate a full preference document.
pub fn validate_preferences(fields: &Fields) -> Result<()> {
  require_fields(fields, PREFERENCE_REQUIRED)?;
  check_locations(&fields["favorite_locations"])?;
  check_unit(&fields["temperature_unit"])?;
  check_notifications(fields.get("notification_enabled"))
}

/// Type-check only the recognised fields of a partial preference update.
/// Unrecognised fields pass through untouched.
pub fn validate_preference_update(partial: &Fields) -> Result<()> {
  if let Some(v) = partial.get("favorite_locations") {
    check_locations(v)?;
  }
  if let Some(v) = partial.get("temperature_unit") {
    check_unit(v)?;
  }
  check_notifications(partial.get("notification_enabled"))
}

/// Validate the caller-supplied part of a location weather event.
pub fn validate_weather_event(fields: &Fields) -> Result<()> {
  require_fields(fields, WEATHER_EVENT_REQUIRED)
}

/// Validate a daily weather record: an ISO date and a numeric mean
/// temperature are required.
pub fn validate_weather_record(fields: &Fields) -> Result<()> {
  require_fields(fields, &["date", "mean_temp"])?;
  let date = fields["date"]
    .as_str()
    .ok_or_else(|| invalid("date must be a string"))?;
  NaiveDate::parse_from_str(date, "%Y-%m-%d")
    .map_err(|e| invalid(format!("date {date:?} is not an ISO date: {e}")))?;
  if !fields["mean_temp"].is_number() {
    return Err(invalid(format!(
      "mean_temp must be a number, got {}",
      json_type_name(&fields["mean_temp"])
    )));
  }
  Ok(())
}

/// Pick the validator for documents written to `name`. Collections without a
/// schema accept anything.
pub fn validate_for_collection(name: &str, fields: &Fields) -> Result<()> {
  match name {
    collection::USER_PREFERENCES => validate_preferences(fields),
    collection::LONDON_WEATHER => validate_weather_record(fields),
    collection::WEATHER_DATA => validate_weather_event(fields),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn fields(value: Value) -> Fields {
    match value {
      Value::Object(map) => map,
      _ => unreachable!(),
    }
  }

  #[test]
  fn valid_preferences_pass() {
    let prefs = fields(json!({
      "favorite_locations": ["London", "Leeds"],
      "temperature_unit": "Celsius",
      "notification_enabled": true,
    }));
    assert!(validate_preferences(&prefs).is_ok());
  }

  #[test]
  fn missing_unit_is_rejected() {
    let prefs = fields(json!({ "favorite_locations": ["London"] }));
    let err = validate_preferences(&prefs).unwrap_err();
    assert!(matches!(err, Error::InvalidSchema(ref m) if m.contains("temperature_unit")));
  }

  #[test]
  fn unknown_unit_is_rejected() {
    for unit in [json!("Kelvin"), json!("celsius"), json!(1)] {
      let prefs = fields(json!({
        "favorite_locations": [],
        "temperature_unit": unit,
      }));
      assert!(matches!(
        validate_preferences(&prefs),
        Err(Error::InvalidSchema(_))
      ));
    }
  }

  #[test]
  fn locations_must_be_a_list() {
    let prefs = fields(json!({
      "favorite_locations": "London",
      "temperature_unit": "Fahrenheit",
    }));
    assert!(matches!(
      validate_preferences(&prefs),
      Err(Error::InvalidSchema(_))
    ));
  }

  #[test]
  fn full_document_types_match_the_typed_model() {
    let bad_locations = fields(json!({
      "favorite_locations": [1, 2],
      "temperature_unit": "Celsius",
    }));
    let err = validate_preferences(&bad_locations).unwrap_err();
    assert!(matches!(err, Error::InvalidSchema(ref m) if m.contains("strings")));

    let bad_flag = fields(json!({
      "favorite_locations": ["London"],
      "temperature_unit": "Celsius",
      "notification_enabled": "yes",
    }));
    let err = validate_preferences(&bad_flag).unwrap_err();
    assert!(matches!(err, Error::InvalidSchema(ref m) if m.contains("notification_enabled")));

    let null_flag = fields(json!({
      "favorite_locations": [],
      "temperature_unit": "Celsius",
      "notification_enabled": null,
    }));
    assert!(validate_preferences(&null_flag).is_ok());
    assert!(validate_preference_update(&fields(json!({ "favorite_locations": ["Leeds", 3] }))).is_err());
  }

  #[test]
  fn partial_update_checks_only_supplied_fields() {
    assert!(validate_preference_update(&fields(json!({ "temperature_unit": "Fahrenheit" }))).is_ok());
    assert!(validate_preference_update(&fields(json!({ "theme": "dark" }))).is_ok());
    assert!(validate_preference_update(&fields(json!({ "temperature_unit": "Rankine" }))).is_err());
    assert!(validate_preference_update(&fields(json!({ "notification_enabled": "yes" }))).is_err());
  }

  #[test]
  fn weather_event_requires_all_readings() {
    let ok = fields(json!({ "temperature": 11.5, "humidity": 80, "conditions": "drizzle" }));
    assert!(validate_weather_event(&ok).is_ok());

    let missing = fields(json!({ "temperature": 11.5, "conditions": "drizzle" }));
    let err = validate_weather_event(&missing).unwrap_err();
    assert!(matches!(err, Error::InvalidSchema(ref m) if m.contains("humidity")));
  }

  #[test]
  fn weather_record_needs_date_and_numeric_mean() {
    assert!(validate_weather_record(&fields(json!({ "date": "2020-02-29", "mean_temp": 6.1 }))).is_ok());
    assert!(validate_weather_record(&fields(json!({ "date": "2020-02-30", "mean_temp": 6.1 }))).is_err());
    assert!(validate_weather_record(&fields(json!({ "date": "2020-02-01", "mean_temp": null }))).is_err());
    assert!(validate_weather_record(&fields(json!({ "mean_temp": 6.1 }))).is_err());
  }

  #[test]
  fn unknown_collections_accept_anything() {
    assert!(validate_for_collection("scratch", &Fields::new()).is_ok());
    assert!(validate_for_collection(collection::USER_PREFERENCES, &Fields::new()).is_err());
  }
}
