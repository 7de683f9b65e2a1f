//! Runtime configuration for the data-access layer.

use std::path::PathBuf;

use serde::Deserialize;

/// One below the store's hard cap of 500, leaving room for overhead writes.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 499;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_EVENT_HISTORY_LIMIT: usize = 10;

/// Deserialised from `brolly.toml` and `BROLLY_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardConfig {
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Writes per commit during bulk ingestion.
  #[serde(default = "default_max_batch_size")]
  pub max_batch_size:      usize,
  /// Default cap for range reads.
  #[serde(default = "default_history_limit")]
  pub history_limit:       usize,
  /// Default cap for location event history.
  #[serde(default = "default_event_history_limit")]
  pub event_history_limit: usize,
}

fn default_store_path() -> PathBuf { PathBuf::from("brolly.db") }
fn default_max_batch_size() -> usize { DEFAULT_MAX_BATCH_SIZE }
fn default_history_limit() -> usize { DEFAULT_HISTORY_LIMIT }
fn default_event_history_limit() -> usize { DEFAULT_EVENT_HISTORY_LIMIT }

impl Default for DashboardConfig {
  fn default() -> Self {
    Self {
      store_path:          default_store_path(),
      max_batch_size:      DEFAULT_MAX_BATCH_SIZE,
      history_limit:       DEFAULT_HISTORY_LIMIT,
      event_history_limit: DEFAULT_EVENT_HISTORY_LIMIT,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_keys_fall_back_to_defaults() {
    let cfg: DashboardConfig = serde_json::from_str(r#"{ "max_batch_size": 100 }"#).unwrap();
    assert_eq!(cfg.max_batch_size, 100);
    assert_eq!(cfg.history_limit, DEFAULT_HISTORY_LIMIT);
    assert_eq!(cfg.store_path, PathBuf::from("brolly.db"));
  }

  #[test]
  fn empty_config_equals_default() {
    let cfg: DashboardConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, DashboardConfig::default());
  }
}
