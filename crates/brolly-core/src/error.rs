//! Error types for `brolly-core`.
//!
//! This is the error surface of the store-client contract. Backends convert
//! their own failures into [`Error::Backend`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid schema: {0}")]
  InvalidSchema(String),

  #[error("document not found: {collection}/{key}")]
  NotFound { collection: String, key: String },

  #[error("document already exists: {collection}/{key}")]
  AlreadyExists { collection: String, key: String },

  #[error("batch of {size} writes exceeds the limit of {max}")]
  BatchTooLarge { size: usize, max: usize },

  #[error("connection failure: {0}")]
  Connection(String),

  #[error("subscription error: {0}")]
  Subscription(String),

  #[error("invalid token: {0}")]
  InvalidToken(String),

  #[error("failed to create user: {0}")]
  UserCreationFailed(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(collection: &str, key: &str) -> Self {
    Self::NotFound { collection: collection.to_owned(), key: key.to_owned() }
  }

  pub fn already_exists(collection: &str, key: &str) -> Self {
    Self::AlreadyExists {
      collection: collection.to_owned(),
      key:        key.to_owned(),
    }
  }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
