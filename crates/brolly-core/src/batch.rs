//! Write batches — sets of document writes committed atomically.

use crate::document::Fields;

/// The store's hard cap on writes in a single commit.
pub const MAX_BATCH_WRITES: usize = 500;

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
  /// Full-document replace (or create) at `key`.
  Set {
    collection: String,
    key:        String,
    fields:     Fields,
  },
  Delete {
    collection: String,
    key:        String,
  },
}

impl BatchWrite {
  pub fn collection(&self) -> &str {
    match self {
      Self::Set { collection, .. } | Self::Delete { collection, .. } => collection,
    }
  }

  pub fn key(&self) -> &str {
    match self {
      Self::Set { key, .. } | Self::Delete { key, .. } => key,
    }
  }
}

/// An ordered sequence of pending writes. Nothing reaches the store until the
/// batch is handed to [`crate::store::DocumentStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
  writes: Vec<BatchWrite>,
}

impl WriteBatch {
  pub fn new() -> Self { Self::default() }

  pub fn set(
    &mut self,
    collection: impl Into<String>,
    key: impl Into<String>,
    fields: Fields,
  ) -> &mut Self {
    self.writes.push(BatchWrite::Set {
      collection: collection.into(),
      key: key.into(),
      fields,
    });
    self
  }

  pub fn delete(
    &mut self,
    collection: impl Into<String>,
    key: impl Into<String>,
  ) -> &mut Self {
    self.writes.push(BatchWrite::Delete {
      collection: collection.into(),
      key:        key.into(),
    });
    self
  }

  pub fn len(&self) -> usize { self.writes.len() }

  pub fn is_empty(&self) -> bool { self.writes.is_empty() }

  pub fn writes(&self) -> &[BatchWrite] { &self.writes }

  pub fn into_writes(self) -> Vec<BatchWrite> { self.writes }
}
