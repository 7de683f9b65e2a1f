//! Error type for the data-access layer.
//!
//! Every variant carries the operation, key or progress a caller needs to
//! decide whether to retry, skip or abort. The layer itself never retries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Local validation failed; nothing was sent to the store.
  #[error("invalid schema: {0}")]
  InvalidSchema(String),

  #[error("document not found: {collection}/{key}")]
  NotFound { collection: String, key: String },

  /// A bulk write stopped at a failed commit. The first `committed`
  /// documents (in `batches` batches) are persisted; resume from there.
  #[error("bulk write aborted after {committed} documents in {batches} batches: {source}")]
  BatchCommitFailed {
    committed: usize,
    batches:   usize,
    source:    brolly_core::Error,
  },

  #[error("failed to connect to the document store: {0}")]
  ConnectionFailure(#[source] brolly_core::Error),

  #[error("listener {filter_key:?} failed: {source}")]
  Subscription {
    filter_key: String,
    source:     brolly_core::Error,
  },

  #[error("batch size must be between 1 and {max}, got {size}")]
  InvalidBatchSize { size: usize, max: usize },

  #[error("authentication failed: {0}")]
  Auth(#[source] brolly_core::Error),

  /// Any other store-client failure, annotated with the failing operation.
  #[error("{operation} failed: {source}")]
  Store {
    operation: &'static str,
    source:    brolly_core::Error,
  },
}

/// Map a store-client error raised during `operation` into the layer
/// taxonomy. Schema and missing-document errors keep their identity.
pub(crate) fn annotate(operation: &'static str) -> impl FnOnce(brolly_core::Error) -> Error {
  move |e| match e {
    brolly_core::Error::InvalidSchema(msg) => Error::InvalidSchema(msg),
    brolly_core::Error::NotFound { collection, key } => Error::NotFound { collection, key },
    auth @ (brolly_core::Error::InvalidToken(_) | brolly_core::Error::UserCreationFailed(_)) => {
      Error::Auth(auth)
    }
    source => Error::Store { operation, source },
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
