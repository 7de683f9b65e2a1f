//! Live listeners keyed by a filter key (e.g. a location name).
//!
//! Each key maps to at most one live subscription. Registering a key that is
//! already active releases the old subscription first, so a handler is never
//! doubled up; removing an inactive key is a no-op.

use std::{collections::HashMap, sync::Arc};

use brolly_core::{
  change::{ChangeHandler, Subscription},
  query::Query,
  store::DocumentStore,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{Error, Result};

pub struct SubscriptionManager<S> {
  store:  Arc<S>,
  active: Mutex<HashMap<String, Subscription>>,
}

impl<S: DocumentStore> SubscriptionManager<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, active: Mutex::new(HashMap::new()) }
  }

  /// Register `handler` for documents matching `query` under `filter_key`,
  /// replacing any listener already registered under that key.
  pub async fn add_listener(
    &self,
    filter_key: &str,
    query: Query,
    handler: ChangeHandler,
  ) -> Result<()> {
    // Held across both store calls so concurrent registrations for the same
    // key cannot interleave.
    let mut active = self.active.lock().await;

    if let Some(previous) = active.remove(filter_key) {
      warn!(filter_key, "replacing active listener");
      self
        .store
        .unsubscribe(previous)
        .await
        .map_err(|source| subscription_error(filter_key, source))?;
    }

    let subscription = self
      .store
      .subscribe(query, handler)
      .await
      .map_err(|source| subscription_error(filter_key, source))?;
    active.insert(filter_key.to_owned(), subscription);

    info!(filter_key, "listener registered");
    Ok(())
  }

  /// Release the listener for `filter_key`. Returns whether one was active.
  pub async fn remove_listener(&self, filter_key: &str) -> Result<bool> {
    let mut active = self.active.lock().await;
    let Some(subscription) = active.remove(filter_key) else {
      return Ok(false);
    };
    self
      .store
      .unsubscribe(subscription)
      .await
      .map_err(|source| subscription_error(filter_key, source))?;

    info!(filter_key, "listener removed");
    Ok(true)
  }

  pub async fn is_active(&self, filter_key: &str) -> bool {
    self.active.lock().await.contains_key(filter_key)
  }

  /// Keys with a live listener, sorted.
  pub async fn active_keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.active.lock().await.keys().cloned().collect();
    keys.sort();
    keys
  }

  /// Release every listener. Every handle is attempted; the first failure
  /// is returned.
  pub async fn clear(&self) -> Result<()> {
    let mut active = self.active.lock().await;
    let mut first_error = None;
    for (filter_key, subscription) in active.drain().collect::<Vec<_>>() {
      if let Err(source) = self.store.unsubscribe(subscription).await {
        warn!(filter_key = %filter_key, error = %source, "failed to release listener");
        first_error.get_or_insert(subscription_error(&filter_key, source));
      }
    }
    first_error.map_or(Ok(()), Err)
  }
}

fn subscription_error(filter_key: &str, source: brolly_core::Error) -> Error {
  Error::Subscription { filter_key: filter_key.to_owned(), source }
}
