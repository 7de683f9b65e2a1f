//! Per-user preference documents in `user_preferences`, keyed by user id.

use std::sync::Arc;

use brolly_core::{
  collection::USER_PREFERENCES,
  document::{Fields, to_fields},
  prefs::UserPreferences,
  schema::{validate_preference_update, validate_preferences},
  store::DocumentStore,
};
use tracing::debug;

use crate::{Result, error::annotate};

pub struct PreferenceStore<S> {
  store: Arc<S>,
}

impl<S: DocumentStore> PreferenceStore<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Validate and fully overwrite the preferences for `user_id`.
  pub async fn save(&self, user_id: &str, prefs: &UserPreferences) -> Result<()> {
    let fields = to_fields(prefs).map_err(annotate("save_preferences"))?;
    self.save_fields(user_id, fields).await
  }

  /// As [`Self::save`], for an untyped field map. Invalid maps are rejected
  /// before anything is written.
  pub async fn save_fields(&self, user_id: &str, fields: Fields) -> Result<()> {
    validate_preferences(&fields).map_err(annotate("save_preferences"))?;
    self
      .store
      .set_document(USER_PREFERENCES, user_id, fields)
      .await
      .map_err(annotate("save_preferences"))?;
    debug!(user_id, "preferences saved");
    Ok(())
  }

  /// Returns `None` if the user has no preferences stored.
  pub async fn get(&self, user_id: &str) -> Result<Option<UserPreferences>> {
    let doc = self
      .store
      .get_document(USER_PREFERENCES, user_id)
      .await
      .map_err(annotate("get_preferences"))?;
    doc
      .map(|d| d.decode())
      .transpose()
      .map_err(annotate("get_preferences"))
  }

  /// Merge `partial` into existing preferences. Only recognised fields are
  /// type-checked; fails with `NotFound` if the user has none stored.
  pub async fn update(&self, user_id: &str, partial: Fields) -> Result<()> {
    validate_preference_update(&partial).map_err(annotate("update_preferences"))?;
    self
      .store
      .update_document(USER_PREFERENCES, user_id, partial)
      .await
      .map_err(annotate("update_preferences"))?;
    debug!(user_id, "preferences updated");
    Ok(())
  }

  /// Succeeds whether or not the document existed.
  pub async fn delete(&self, user_id: &str) -> Result<()> {
    self
      .store
      .delete_document(USER_PREFERENCES, user_id)
      .await
      .map_err(annotate("delete_preferences"))?;
    debug!(user_id, "preferences deleted");
    Ok(())
  }
}
