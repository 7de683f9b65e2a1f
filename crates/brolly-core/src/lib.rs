//! Core types and trait definitions for the Brolly weather store.
//!
//! This crate is deliberately free of database and runtime dependencies.
//! Backends implement [`store::DocumentStore`]; the data-access layer in
//! `brolly-dashboard` depends only on that abstraction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod batch;
pub mod change;
pub mod document;
pub mod error;
pub mod prefs;
pub mod query;
pub mod schema;
pub mod store;
pub mod weather;

pub use error::{Error, Result};

/// Collection names; part of the persisted layout and must stay stable.
pub mod collection {
  pub const USER_PREFERENCES: &str = "user_preferences";
  pub const WEATHER_DATA: &str = "weather_data";
  pub const LONDON_WEATHER: &str = "london_weather";
  pub const USERS: &str = "users";
  /// One document per registered email, keyed by the email, holding the
  /// owning user id.
  pub const USER_EMAILS: &str = "user_emails";
}
