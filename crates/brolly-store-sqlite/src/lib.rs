//! SQLite backend for the Brolly document store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Live subscriptions are fed from the
//! same thread, so a subscriber never misses or double-counts a commit.

mod encode;
mod schema;
mod store;
mod subscription;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
