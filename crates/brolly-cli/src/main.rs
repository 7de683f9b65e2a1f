//! `brolly` — command-line front end for the Brolly weather store.
//!
//! Reads `brolly.toml` (or the path given with `--config`) layered under
//! `BROLLY_*` environment variables, opens the SQLite document store, and runs
//! one command against the data-access layer.
//!
//! # Usage
//!
//! ```
//! brolly import london_weather.json
//! brolly history --start 2020-01-01 --end 2020-01-31
//! brolly prefs set alice --unit Celsius --location London
//! brolly prefs update alice --notify false
//! brolly watch London
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, Result};
use brolly_core::{
  auth::CredentialVerifier as _,
  change::{ChangeHandler, ChangeKind, ChangeSet},
  document::Fields,
  prefs::{TemperatureUnit, UserPreferences},
  weather::{WeatherReading, WeatherRecord},
};
use brolly_dashboard::{
  DashboardConfig, WeatherDashboard,
  aggregate::summarize,
  auth::LocalAuth,
};
use brolly_store_sqlite::SqliteStore;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Brolly weather store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "brolly.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Bulk-import daily London records from a JSON array file.
  Import { file: PathBuf },

  /// Print London records within a date range.
  History {
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end:   Option<NaiveDate>,
    #[arg(long)]
    limit: Option<usize>,
  },

  /// Print the mean temperature for every stored month.
  Monthly,

  /// Manage per-user preferences.
  Prefs {
    #[command(subcommand)]
    action: PrefsAction,
  },

  /// Record a weather event for a location.
  Record {
    location:    String,
    #[arg(long)]
    temperature: f64,
    #[arg(long)]
    humidity:    f64,
    #[arg(long)]
    conditions:  String,
  },

  /// Print the latest events recorded for a location.
  Events {
    location: String,
    #[arg(long)]
    limit:    Option<usize>,
  },

  /// Stream events for a location until Ctrl-C.
  Watch { location: String },

  /// Create a local user account.
  CreateUser { email: String, password: String },
}

#[derive(Subcommand)]
enum PrefsAction {
  Show { user_id: String },
  Set {
    user_id:  String,
    #[arg(long, default_value = "Celsius")]
    unit:     TemperatureUnit,
    /// Favourite location; repeat for several.
    #[arg(long = "location")]
    locations: Vec<String>,
    #[arg(long)]
    notify:   Option<bool>,
  },
  /// Change only the supplied fields of existing preferences.
  Update {
    user_id:   String,
    #[arg(long)]
    unit:      Option<TemperatureUnit>,
    /// Replaces the favourite locations; repeat for several.
    #[arg(long = "location")]
    locations: Vec<String>,
    #[arg(long)]
    notify:    Option<bool>,
  },
  Delete { user_id: String },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("BROLLY"))
    .build()
    .context("failed to read config file")?;
  let dashboard_cfg: DashboardConfig = settings
    .try_deserialize()
    .context("failed to deserialise DashboardConfig")?;

  let store_path = dashboard_cfg.store_path.clone();
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );
  let dashboard = WeatherDashboard::connect_shared(store.clone(), dashboard_cfg)
    .await
    .context("failed to connect to the document store")?;

  match cli.command {
    Command::Import { file } => import(&dashboard, &file).await,
    Command::History { start, end, limit } => history(&dashboard, start, end, limit).await,
    Command::Monthly => monthly(&dashboard).await,
    Command::Prefs { action } => prefs(&dashboard, action).await,
    Command::Record { location, temperature, humidity, conditions } => {
      let reading = WeatherReading { temperature, humidity, conditions };
      let key = dashboard.record_reading(&location, &reading).await?;
      println!("recorded {key}");
      Ok(())
    }
    Command::Events { location, limit } => {
      for event in dashboard.weather_history(&location, limit).await? {
        println!(
          "{}  {:>6.1}°C  {:>5.1}%  {}",
          event.timestamp, event.temperature, event.humidity, event.conditions
        );
      }
      Ok(())
    }
    Command::Watch { location } => watch(&dashboard, &location).await,
    Command::CreateUser { email, password } => {
      let user = LocalAuth::new(store).create_user(&email, &password).await?;
      println!("created user {} <{}>", user.id, user.email);
      Ok(())
    }
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn import(dashboard: &WeatherDashboard<SqliteStore>, file: &Path) -> Result<()> {
  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading {}", file.display()))?;
  let records: Vec<WeatherRecord> =
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

  tracing::info!(records = records.len(), "importing London records");
  let report = dashboard.save_london_weather(records).await?;
  println!("imported {} records in {} batches", report.documents, report.batches);
  Ok(())
}

async fn history(
  dashboard: &WeatherDashboard<SqliteStore>,
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
  limit: Option<usize>,
) -> Result<()> {
  let mut records = dashboard.london_weather_history(start, end, limit).await?;
  // Range reads come back in store order.
  records.sort_by_key(|r| r.date);
  for r in &records {
    println!("{}  {:>6.1}°C", r.date, r.mean_temp);
  }
  if let Some(s) = summarize(&records) {
    println!(
      "\n{} days: mean {:.1}°C, max {:.1}°C, min {:.1}°C",
      s.count, s.mean, s.max, s.min
    );
  }
  Ok(())
}

async fn monthly(dashboard: &WeatherDashboard<SqliteStore>) -> Result<()> {
  for (month, avg) in dashboard.monthly_averages().await? {
    println!("{month}  {avg:>6.2}°C");
  }
  Ok(())
}

async fn prefs(dashboard: &WeatherDashboard<SqliteStore>, action: PrefsAction) -> Result<()> {
  match action {
    PrefsAction::Show { user_id } => match dashboard.get_user_preferences(&user_id).await? {
      Some(p) => println!("{}", serde_json::to_string_pretty(&p)?),
      None => println!("no preferences stored for {user_id}"),
    },
    PrefsAction::Set { user_id, unit, locations, notify } => {
      let p = UserPreferences {
        favorite_locations:   locations,
        temperature_unit:     unit,
        notification_enabled: notify,
      };
      dashboard.save_weather_preferences(&user_id, &p).await?;
      println!("saved preferences for {user_id}");
    }
    PrefsAction::Update { user_id, unit, locations, notify } => {
      let updates = preference_updates(unit, locations, notify);
      anyhow::ensure!(!updates.is_empty(), "nothing to update");
      dashboard.update_preference(&user_id, updates).await?;
      println!("updated preferences for {user_id}");
    }
    PrefsAction::Delete { user_id } => {
      dashboard.delete_preference(&user_id).await?;
      println!("deleted preferences for {user_id}");
    }
  }
  Ok(())
}

/// The partial document for `prefs update`: only flags that were given.
fn preference_updates(
  unit: Option<TemperatureUnit>,
  locations: Vec<String>,
  notify: Option<bool>,
) -> Fields {
  let mut updates = Fields::new();
  if let Some(unit) = unit {
    updates.insert("temperature_unit".into(), Value::from(unit.to_string()));
  }
  if !locations.is_empty() {
    updates.insert("favorite_locations".into(), Value::from(locations));
  }
  if let Some(notify) = notify {
    updates.insert("notification_enabled".into(), Value::from(notify));
  }
  updates
}

async fn watch(dashboard: &WeatherDashboard<SqliteStore>, location: &str) -> Result<()> {
  let handler: ChangeHandler = Arc::new(|set: ChangeSet| {
    for change in set.of_kind(ChangeKind::Added) {
      let doc = &change.document;
      println!(
        "{}: {}°C, {}",
        doc.get("location").and_then(|v| v.as_str()).unwrap_or("?"),
        doc.get("temperature").cloned().unwrap_or_default(),
        doc.get("conditions").and_then(|v| v.as_str()).unwrap_or("?"),
      );
    }
  });

  dashboard.add_realtime_weather_listener(location, handler).await?;
  println!("listening for {location} (Ctrl-C to stop)...");
  tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;

  dashboard.remove_weather_listener(location).await?;
  dashboard.shutdown().await?;
  Ok(())
}
