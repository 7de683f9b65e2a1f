//! The `DocumentStore` trait — the store-client contract.
//!
//! The trait is implemented by storage backends (e.g. `brolly-store-sqlite`).
//! The data-access layer in `brolly-dashboard` sequences calls against this
//! abstraction and never talks to a concrete backend. Connection pooling,
//! retries and timeouts are backend concerns.

use std::future::Future;

use crate::{
  Result,
  batch::WriteBatch,
  change::{ChangeHandler, Subscription},
  document::{Document, Fields},
  query::Query,
};

/// Abstraction over a remote (or embedded) document store.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait DocumentStore: Send + Sync {
  /// Cheap liveness check used when the data-access layer is constructed.
  fn ping(&self) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Fetch one document. Returns `None` if the key is absent.
  fn get_document<'a>(
    &'a self,
    collection: &'a str,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Document>>> + Send + 'a;

  /// Create or fully replace the document at `key`.
  fn set_document<'a>(
    &'a self,
    collection: &'a str,
    key: &'a str,
    fields: Fields,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Create the document at `key`, failing with `AlreadyExists` if it is
  /// already present.
  fn create_document<'a>(
    &'a self,
    collection: &'a str,
    key: &'a str,
    fields: Fields,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Merge `partial` into the existing document. Fails with `NotFound` if
  /// the key is absent.
  fn update_document<'a>(
    &'a self,
    collection: &'a str,
    key: &'a str,
    partial: Fields,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Delete the document at `key`. Deleting an absent key succeeds.
  fn delete_document<'a>(
    &'a self,
    collection: &'a str,
    key: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  // ── Queries ───────────────────────────────────────────────────────────

  /// Run a filtered query. An empty result is not an error.
  fn query<'a>(
    &'a self,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Document>>> + Send + 'a;

  // ── Batches ───────────────────────────────────────────────────────────

  /// Start an empty batch.
  fn open_batch(&self) -> WriteBatch { WriteBatch::new() }

  /// Apply every write in `batch` atomically. Returns the number of writes
  /// applied. Batches larger than
  /// [`MAX_BATCH_WRITES`](crate::batch::MAX_BATCH_WRITES) are rejected.
  fn commit(
    &self,
    batch: WriteBatch,
  ) -> impl Future<Output = Result<usize>> + Send + '_;

  // ── Live subscriptions ────────────────────────────────────────────────

  /// Register `handler` for changes to documents matching `query`. The
  /// handler first receives a snapshot of the current matches.
  fn subscribe(
    &self,
    query: Query,
    handler: ChangeHandler,
  ) -> impl Future<Output = Result<Subscription>> + Send + '_;

  /// Stop deliveries for `subscription`. When this resolves, no delivery for
  /// the handle is still running.
  fn unsubscribe(
    &self,
    subscription: Subscription,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}
