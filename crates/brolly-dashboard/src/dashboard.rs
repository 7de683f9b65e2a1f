//! [`WeatherDashboard`] — the single entry point callers (CLI, dashboards,
//! analysis scripts) use.
//!
//! Owns the store handle and composes the preference store, batched writer,
//! range reader, listener table and event log over it. The handle is passed
//! in explicitly; nothing here assumes a process-wide store.

use std::{collections::BTreeMap, sync::Arc};

use brolly_core::{
  change::ChangeHandler,
  collection::LONDON_WEATHER,
  document::Fields,
  prefs::UserPreferences,
  query::Query,
  store::DocumentStore,
  weather::{LocationWeatherEvent, WeatherReading, WeatherRecord},
};
use chrono::NaiveDate;
use tracing::info;

use crate::{
  DashboardConfig, Error, Result,
  aggregate::{self, YearMonth},
  bulk::{BatchedWriter, BulkWriteReport},
  error::annotate,
  events::{WeatherEvents, location_query},
  listeners::SubscriptionManager,
  prefs::PreferenceStore,
  range::RangeReader,
};

pub struct WeatherDashboard<S> {
  store:       Arc<S>,
  config:      DashboardConfig,
  preferences: PreferenceStore<S>,
  writer:      BatchedWriter<S>,
  reader:      RangeReader<S>,
  listeners:   SubscriptionManager<S>,
  events:      WeatherEvents<S>,
}

impl<S: DocumentStore> WeatherDashboard<S> {
  /// Take ownership of `store` and verify it is reachable. A store that
  /// cannot be reached is fatal: the caller must construct a new one.
  pub async fn connect(store: S, config: DashboardConfig) -> Result<Self> {
    Self::connect_shared(Arc::new(store), config).await
  }

  /// As [`Self::connect`], for a store handle shared with other code.
  pub async fn connect_shared(store: Arc<S>, config: DashboardConfig) -> Result<Self> {
    store.ping().await.map_err(Error::ConnectionFailure)?;
    info!(max_batch_size = config.max_batch_size, "weather dashboard connected");

    Ok(Self {
      preferences: PreferenceStore::new(store.clone()),
      writer: BatchedWriter::new(store.clone()),
      reader: RangeReader::new(store.clone()),
      listeners: SubscriptionManager::new(store.clone()),
      events: WeatherEvents::new(store.clone()),
      store,
      config,
    })
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &DashboardConfig { &self.config }

  pub fn preferences(&self) -> &PreferenceStore<S> { &self.preferences }

  pub fn writer(&self) -> &BatchedWriter<S> { &self.writer }

  pub fn reader(&self) -> &RangeReader<S> { &self.reader }

  pub fn listeners(&self) -> &SubscriptionManager<S> { &self.listeners }

  pub fn events(&self) -> &WeatherEvents<S> { &self.events }

  // ── Preferences ─────────────────────────────────────────────────────────

  pub async fn save_weather_preferences(
    &self,
    user_id: &str,
    prefs: &UserPreferences,
  ) -> Result<()> {
    self.preferences.save(user_id, prefs).await
  }

  pub async fn get_user_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
    self.preferences.get(user_id).await
  }

  pub async fn update_preference(&self, user_id: &str, updates: Fields) -> Result<()> {
    self.preferences.update(user_id, updates).await
  }

  pub async fn delete_preference(&self, user_id: &str) -> Result<()> {
    self.preferences.delete(user_id).await
  }

  // ── Location events ─────────────────────────────────────────────────────

  pub async fn save_weather_data(&self, location: &str, data: &Fields) -> Result<String> {
    self.events.save_weather_data(location, data).await
  }

  pub async fn record_reading(&self, location: &str, reading: &WeatherReading) -> Result<String> {
    self.events.record(location, reading).await
  }

  /// Newest events first; `limit` defaults to the configured event history
  /// limit.
  pub async fn weather_history(
    &self,
    location: &str,
    limit: Option<usize>,
  ) -> Result<Vec<LocationWeatherEvent>> {
    let limit = limit.unwrap_or(self.config.event_history_limit);
    self.events.history(location, limit).await
  }

  /// Listen for events at `location`. Replaces any listener already
  /// registered for that location.
  pub async fn add_realtime_weather_listener(
    &self,
    location: &str,
    handler: ChangeHandler,
  ) -> Result<()> {
    self
      .listeners
      .add_listener(location, location_query(location), handler)
      .await
  }

  /// Returns whether a listener was active. Safe to call repeatedly.
  pub async fn remove_weather_listener(&self, location: &str) -> Result<bool> {
    self.listeners.remove_listener(location).await
  }

  // ── London daily records ────────────────────────────────────────────────

  /// Bulk-import daily records keyed by ISO date, using the configured batch
  /// ceiling.
  pub async fn save_london_weather(
    &self,
    records: impl IntoIterator<Item = WeatherRecord>,
  ) -> Result<BulkWriteReport> {
    self
      .writer
      .bulk_write(LONDON_WEATHER, records, WeatherRecord::key, self.config.max_batch_size)
      .await
  }

  /// Records dated within `[start, end]`, in store order. `limit` defaults to
  /// the configured history limit.
  pub async fn london_weather_history(
    &self,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    limit: Option<usize>,
  ) -> Result<Vec<WeatherRecord>> {
    let limit = limit.unwrap_or(self.config.history_limit);
    let docs = self
      .reader
      .read_range(LONDON_WEATHER, start, end, limit)
      .await?;
    docs
      .iter()
      .map(|d| d.decode())
      .collect::<brolly_core::Result<_>>()
      .map_err(annotate("london_weather_history"))
  }

  /// Mean temperature per month over the whole London collection.
  pub async fn monthly_averages(&self) -> Result<BTreeMap<YearMonth, f64>> {
    let docs = self
      .store
      .query(&Query::collection(LONDON_WEATHER))
      .await
      .map_err(annotate("monthly_averages"))?;
    let records = docs
      .iter()
      .map(|d| d.decode::<WeatherRecord>())
      .collect::<brolly_core::Result<Vec<_>>>()
      .map_err(annotate("monthly_averages"))?;
    Ok(aggregate::monthly_averages(&records))
  }

  /// Release every live listener.
  pub async fn shutdown(&self) -> Result<()> {
    self.listeners.clear().await?;
    info!("weather dashboard shut down");
    Ok(())
  }
}
