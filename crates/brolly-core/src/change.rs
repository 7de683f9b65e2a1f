//! Live change notifications delivered to subscription handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;

/// How a document changed relative to a subscription's predicate.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
  /// The document started matching (created, or updated into the result set).
  Added,
  /// A matching document was overwritten and still matches.
  Modified,
  /// The document stopped matching (deleted, or updated out of the set).
  Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChange {
  pub kind:     ChangeKind,
  /// The new contents, or the last known contents for `Removed`.
  pub document: Document,
}

/// One delivery to a handler: the changes from a single commit, or the
/// initial snapshot when the subscription is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
  pub changes:   Vec<DocumentChange>,
  pub read_time: DateTime<Utc>,
}

impl ChangeSet {
  /// Changes of one kind only.
  pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &DocumentChange> {
    self.changes.iter().filter(move |c| c.kind == kind)
  }
}

/// Caller-supplied callback. Runs on the store's delivery task, so it must
/// not block for long.
pub type ChangeHandler = Arc<dyn Fn(ChangeSet) + Send + Sync>;

/// Opaque handle for a live subscription, returned by
/// [`crate::store::DocumentStore::subscribe`]. Consumed by `unsubscribe`, so
/// a handle can be released at most once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
  id:         u64,
  collection: String,
}

impl Subscription {
  /// Backends mint handles; callers only hold and return them.
  pub fn new(id: u64, collection: impl Into<String>) -> Self {
    Self { id, collection: collection.into() }
  }

  pub fn id(&self) -> u64 { self.id }

  pub fn collection(&self) -> &str { &self.collection }
}
