//! The Brolly data-access layer.
//!
//! Mediates between the daily London weather dataset, per-user preferences,
//! location weather events and any [`brolly_core::store::DocumentStore`]:
//! validated writes, bounded batch ingestion, range reads, live listeners and
//! monthly aggregation. Transport and credentials are the store's concern.
//!
//! ```rust,ignore
//! let store = SqliteStore::open("brolly.db").await?;
//! let dashboard = WeatherDashboard::connect(store, DashboardConfig::default()).await?;
//! dashboard.save_london_weather(records).await?;
//! ```

pub mod aggregate;
pub mod auth;
pub mod bulk;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod listeners;
pub mod prefs;
pub mod range;

pub use config::DashboardConfig;
pub use dashboard::WeatherDashboard;
pub use error::{Error, Result};
