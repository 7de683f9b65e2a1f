//! Weather record types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of London weather observations, keyed by its ISO date.
///
/// Only `mean_temp` is required; every other measurement may be missing from
/// the source data and is stored as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
  pub date:             NaiveDate,
  pub mean_temp:        f64,
  #[serde(default)]
  pub max_temp:         Option<f64>,
  #[serde(default)]
  pub min_temp:         Option<f64>,
  #[serde(default)]
  pub cloud_cover:      Option<f64>,
  #[serde(default)]
  pub precipitation:    Option<f64>,
  #[serde(default)]
  pub pressure:         Option<f64>,
  #[serde(default)]
  pub sunshine:         Option<f64>,
  #[serde(default)]
  pub snow_depth:       Option<f64>,
  #[serde(default)]
  pub global_radiation: Option<f64>,
}

impl WeatherRecord {
  /// A record with only the required measurement set.
  pub fn new(date: NaiveDate, mean_temp: f64) -> Self {
    Self {
      date,
      mean_temp,
      max_temp: None,
      min_temp: None,
      cloud_cover: None,
      precipitation: None,
      pressure: None,
      sunshine: None,
      snow_depth: None,
      global_radiation: None,
    }
  }

  /// The document key: the date in `YYYY-MM-DD` form.
  pub fn key(&self) -> String { self.date.format("%Y-%m-%d").to_string() }
}

/// An append-only observation for a named location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWeatherEvent {
  pub location:    String,
  pub temperature: f64,
  pub humidity:    f64,
  pub conditions:  String,
  /// ISO-8601 UTC timestamp of when the event was recorded.
  pub timestamp:   String,
}

/// The caller-supplied part of a [`LocationWeatherEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
  pub temperature: f64,
  pub humidity:    f64,
  pub conditions:  String,
}
