//! Error type for `brolly-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("subscription task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl From<Error> for brolly_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Json(e) => brolly_core::Error::Serialization(e),
      Error::Task(e) => brolly_core::Error::Subscription(e.to_string()),
      e @ Error::Database(_) => brolly_core::Error::Backend(Box::new(e)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
