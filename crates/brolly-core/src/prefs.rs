//! Per-user preference documents.

use serde::{Deserialize, Serialize};

/// The unit a user wants temperatures displayed in. Stored verbatim as
/// `"Celsius"` or `"Fahrenheit"`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::VariantNames,
)]
pub enum TemperatureUnit {
  #[default]
  Celsius,
  Fahrenheit,
}

impl TemperatureUnit {
  /// Convert a Celsius reading into this unit.
  pub fn from_celsius(self, celsius: f64) -> f64 {
    match self {
      Self::Celsius => celsius,
      Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
  pub favorite_locations:   Vec<String>,
  pub temperature_unit:     TemperatureUnit,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notification_enabled: Option<bool>,
}
