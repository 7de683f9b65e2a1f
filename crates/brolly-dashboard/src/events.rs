//! Append-only location weather events in `weather_data`.
//!
//! Events are keyed by their ISO-8601 UTC timestamp. Two events recorded in
//! the same microsecond would collide, so each event is created with
//! create-if-absent semantics and a `-N` suffix is added to the key until a
//! free one is found. An existing event is never overwritten.

use std::sync::Arc;

use brolly_core::{
  collection::WEATHER_DATA,
  document::{Fields, to_fields},
  query::{Direction, Query},
  schema::validate_weather_event,
  store::DocumentStore,
  weather::{LocationWeatherEvent, WeatherReading},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result, error::annotate};

/// Give up after this many same-timestamp collisions.
pub const MAX_KEY_ATTEMPTS: usize = 64;

/// The document key for the `attempt`-th try at storing an event stamped
/// `timestamp`.
pub fn event_key(timestamp: &str, attempt: usize) -> String {
  if attempt == 0 {
    timestamp.to_owned()
  } else {
    format!("{timestamp}-{attempt}")
  }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct WeatherEvents<S> {
  store: Arc<S>,
}

impl<S: DocumentStore> WeatherEvents<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Validate `data` (temperature, humidity and conditions are required) and
  /// append an event for `location`. Returns the key it was stored under.
  pub async fn save_weather_data(&self, location: &str, data: &Fields) -> Result<String> {
    validate_weather_event(data).map_err(annotate("save_weather_data"))?;

    let timestamp = format_timestamp(Utc::now());
    let mut fields = Fields::new();
    fields.insert("location".into(), Value::from(location));
    for name in ["temperature", "humidity", "conditions"] {
      fields.insert(name.into(), data[name].clone());
    }
    fields.insert("timestamp".into(), Value::from(timestamp.clone()));

    for attempt in 0..MAX_KEY_ATTEMPTS {
      let key = event_key(&timestamp, attempt);
      match self.store.create_document(WEATHER_DATA, &key, fields.clone()).await {
        Ok(()) => {
          debug!(location, %key, "weather event saved");
          return Ok(key);
        }
        Err(brolly_core::Error::AlreadyExists { .. }) => continue,
        Err(e) => return Err(annotate("save_weather_data")(e)),
      }
    }

    Err(Error::Store {
      operation: "save_weather_data",
      source:    brolly_core::Error::already_exists(WEATHER_DATA, &timestamp),
    })
  }

  /// Typed form of [`Self::save_weather_data`].
  pub async fn record(&self, location: &str, reading: &WeatherReading) -> Result<String> {
    let data = to_fields(reading).map_err(annotate("save_weather_data"))?;
    self.save_weather_data(location, &data).await
  }

  /// The newest `limit` events for `location`, newest first.
  pub async fn history(&self, location: &str, limit: usize) -> Result<Vec<LocationWeatherEvent>> {
    let query = Query::collection(WEATHER_DATA)
      .where_eq("location", location)
      .order_by("timestamp", Direction::Descending)
      .limit(limit);
    let docs = self
      .store
      .query(&query)
      .await
      .map_err(annotate("weather_history"))?;
    docs
      .iter()
      .map(|d| d.decode())
      .collect::<brolly_core::Result<_>>()
      .map_err(annotate("weather_history"))
  }
}

/// The standard listener predicate for a location.
pub fn location_query(location: &str) -> Query {
  Query::collection(WEATHER_DATA).where_eq("location", location)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn first_attempt_uses_bare_timestamp() {
    assert_eq!(event_key("2024-03-01T09:00:00.000000Z", 0), "2024-03-01T09:00:00.000000Z");
    assert_eq!(event_key("2024-03-01T09:00:00.000000Z", 2), "2024-03-01T09:00:00.000000Z-2");
  }

  #[test]
  fn timestamps_have_microsecond_precision() {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    assert_eq!(format_timestamp(at), "2024-03-01T09:00:00.000000Z");
  }
}
