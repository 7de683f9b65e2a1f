//! [`SqliteStore`] — the SQLite implementation of [`DocumentStore`].

use std::{
  collections::HashMap,
  path::Path,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
  },
};

use brolly_core::{
  Result,
  batch::{BatchWrite, MAX_BATCH_WRITES, WriteBatch},
  change::{ChangeHandler, Subscription},
  document::{Document, Fields},
  query::{Direction, Query},
  store::DocumentStore,
};
use chrono::Utc;
use rusqlite::{OptionalExtension as _, params_from_iter};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
  Error,
  encode::{
    RawDocument, comparable_types, decode_fields, encode_fields, field_path, sql_value,
  },
  schema::SCHEMA,
  subscription::{self, ActiveSubscription, CHANGE_BUFFER, Committed, WrittenDocument},
};

// ─── Row helpers (run on the database thread) ────────────────────────────────

fn load(
  conn: &rusqlite::Connection,
  collection: &str,
  key: &str,
) -> rusqlite::Result<Option<Fields>> {
  let raw: Option<String> = conn
    .query_row(
      "SELECT fields FROM documents WHERE collection = ?1 AND key = ?2",
      rusqlite::params![collection, key],
      |row| row.get(0),
    )
    .optional()?;
  raw.as_deref().map(decode_fields).transpose()
}

fn upsert(
  conn: &rusqlite::Connection,
  collection: &str,
  key: &str,
  fields: &Fields,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO documents (collection, key, fields, updated_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (collection, key)
     DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at",
    rusqlite::params![collection, key, encode_fields(fields), Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

fn remove(conn: &rusqlite::Connection, collection: &str, key: &str) -> rusqlite::Result<()> {
  conn.execute(
    "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
    rusqlite::params![collection, key],
  )?;
  Ok(())
}

/// Apply one write and report what it changed.
fn apply(conn: &rusqlite::Connection, write: BatchWrite) -> rusqlite::Result<WrittenDocument> {
  match write {
    BatchWrite::Set { collection, key, fields } => {
      let before = load(conn, &collection, &key)?;
      upsert(conn, &collection, &key, &fields)?;
      Ok(WrittenDocument { collection, key, before, after: Some(fields) })
    }
    BatchWrite::Delete { collection, key } => {
      let before = load(conn, &collection, &key)?;
      remove(conn, &collection, &key)?;
      Ok(WrittenDocument { collection, key, before, after: None })
    }
  }
}

fn run_query(conn: &rusqlite::Connection, query: &Query) -> rusqlite::Result<Vec<Document>> {
  // Build WHERE clause dynamically; every operand is a bound parameter.
  let mut sql = String::from("SELECT key, fields FROM documents WHERE collection = ?");
  let mut params = vec![rusqlite::types::Value::Text(query.collection.clone())];

  for filter in &query.filters {
    // SQLite orders values across storage classes; a filter only compares
    // fields of the operand's JSON type.
    let Some(types) = comparable_types(&filter.value) else {
      sql.push_str(" AND 0");
      continue;
    };
    let path = field_path(&filter.field);
    sql.push_str(&format!(
      " AND json_type(fields, ?) IN {types} AND json_extract(fields, ?) {} ?",
      filter.op.as_sql()
    ));
    params.push(rusqlite::types::Value::Text(path.clone()));
    params.push(rusqlite::types::Value::Text(path));
    params.push(sql_value(&filter.value));
  }

  match &query.order_by {
    Some(order) => {
      let dir = match order.direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
      };
      sql.push_str(&format!(" ORDER BY json_extract(fields, ?) {dir}, key {dir}"));
      params.push(rusqlite::types::Value::Text(field_path(&order.field)));
    }
    None => sql.push_str(" ORDER BY key"),
  }

  sql.push_str(" LIMIT ?");
  params.push(rusqlite::types::Value::Integer(
    query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX)),
  ));

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(params), |row| {
      Ok(RawDocument { key: row.get(0)?, fields: row.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawDocument::into_document).collect()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store backed by a single SQLite file.
///
/// Cloning is cheap: the connection, change channel and subscription table
/// are all shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:          tokio_rusqlite::Connection,
  changes:       broadcast::Sender<Arc<Committed>>,
  subscriptions: Arc<Mutex<HashMap<u64, ActiveSubscription>>>,
  next_id:       Arc<AtomicU64>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::from_connection(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::from_connection(conn).await
  }

  async fn from_connection(conn: tokio_rusqlite::Connection) -> crate::Result<Self> {
    let (changes, _) = broadcast::channel(CHANGE_BUFFER);
    let store = Self {
      conn,
      changes,
      subscriptions: Arc::default(),
      next_id: Arc::new(AtomicU64::new(1)),
    };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> crate::Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of subscriptions currently registered.
  pub fn active_subscriptions(&self) -> usize {
    self
      .subscriptions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// Apply `writes` in one transaction and notify subscribers. Runs entirely
  /// on the database thread so notifications are ordered with commits.
  async fn write(&self, writes: Vec<BatchWrite>) -> Result<usize> {
    let changes = self.changes.clone();
    let count = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let applied = writes
          .into_iter()
          .map(|w| apply(&tx, w))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        tx.commit()?;

        let count = applied.len();
        // No receivers is not an error: nobody is subscribed.
        let _ = changes.send(Arc::new(Committed { writes: applied, read_time: Utc::now() }));
        Ok(count)
      })
      .await
      .map_err(Error::Database)?;
    Ok(count)
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await
      .map_err(|e| brolly_core::Error::Connection(e.to_string()))
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn get_document(&self, collection: &str, key: &str) -> Result<Option<Document>> {
    let collection_owned = collection.to_owned();
    let key_owned = key.to_owned();

    let fields = self
      .conn
      .call(move |conn| Ok(load(conn, &collection_owned, &key_owned)?))
      .await
      .map_err(Error::Database)?;

    Ok(fields.map(|f| Document::new(key, f)))
  }

  async fn set_document(&self, collection: &str, key: &str, fields: Fields) -> Result<()> {
    self
      .write(vec![BatchWrite::Set {
        collection: collection.to_owned(),
        key: key.to_owned(),
        fields,
      }])
      .await?;
    Ok(())
  }

  async fn create_document(&self, collection: &str, key: &str, fields: Fields) -> Result<()> {
    let changes = self.changes.clone();
    let collection_owned = collection.to_owned();
    let key_owned = key.to_owned();

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if load(&tx, &collection_owned, &key_owned)?.is_some() {
          return Ok(false);
        }
        upsert(&tx, &collection_owned, &key_owned, &fields)?;
        tx.commit()?;

        let _ = changes.send(Arc::new(Committed {
          writes:    vec![WrittenDocument {
            collection: collection_owned,
            key:        key_owned,
            before:     None,
            after:      Some(fields),
          }],
          read_time: Utc::now(),
        }));
        Ok(true)
      })
      .await
      .map_err(Error::Database)?;

    if created {
      Ok(())
    } else {
      Err(brolly_core::Error::already_exists(collection, key))
    }
  }

  async fn update_document(&self, collection: &str, key: &str, partial: Fields) -> Result<()> {
    let changes = self.changes.clone();
    let collection_owned = collection.to_owned();
    let key_owned = key.to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(before) = load(&tx, &collection_owned, &key_owned)? else {
          return Ok(false);
        };
        let mut after = before.clone();
        after.extend(partial);
        upsert(&tx, &collection_owned, &key_owned, &after)?;
        tx.commit()?;

        let _ = changes.send(Arc::new(Committed {
          writes:    vec![WrittenDocument {
            collection: collection_owned,
            key:        key_owned,
            before:     Some(before),
            after:      Some(after),
          }],
          read_time: Utc::now(),
        }));
        Ok(true)
      })
      .await
      .map_err(Error::Database)?;

    if updated {
      Ok(())
    } else {
      Err(brolly_core::Error::not_found(collection, key))
    }
  }

  async fn delete_document(&self, collection: &str, key: &str) -> Result<()> {
    self
      .write(vec![BatchWrite::Delete {
        collection: collection.to_owned(),
        key:        key.to_owned(),
      }])
      .await?;
    Ok(())
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  async fn query(&self, query: &Query) -> Result<Vec<Document>> {
    let owned = query.clone();
    let docs = self
      .conn
      .call(move |conn| Ok(run_query(conn, &owned)?))
      .await
      .map_err(Error::Database)?;

    debug!(
      collection = %query.collection,
      filters = query.filters.len(),
      returned = docs.len(),
      "query executed"
    );
    Ok(docs)
  }

  // ── Batches ───────────────────────────────────────────────────────────────

  async fn commit(&self, batch: WriteBatch) -> Result<usize> {
    if batch.len() > MAX_BATCH_WRITES {
      return Err(brolly_core::Error::BatchTooLarge {
        size: batch.len(),
        max:  MAX_BATCH_WRITES,
      });
    }
    let count = self.write(batch.into_writes()).await?;
    debug!(writes = count, "batch committed");
    Ok(count)
  }

  // ── Live subscriptions ────────────────────────────────────────────────────

  async fn subscribe(&self, query: Query, handler: ChangeHandler) -> Result<Subscription> {
    let changes = self.changes.clone();
    let snapshot_query = query.clone();

    // Subscribing to the channel and reading the snapshot happen in the same
    // database call, so no commit can fall between them.
    let (rx, initial) = self
      .conn
      .call(move |conn| {
        let rx = changes.subscribe();
        let initial = run_query(conn, &snapshot_query)?;
        Ok((rx, initial))
      })
      .await
      .map_err(|e| brolly_core::Error::Subscription(e.to_string()))?;

    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let collection = query.collection.clone();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(subscription::deliver(
      id,
      query,
      handler,
      initial,
      rx,
      cancel.clone(),
    ));

    self
      .subscriptions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(id, ActiveSubscription { cancel, task });

    info!(subscription = id, %collection, "subscription registered");
    Ok(Subscription::new(id, collection))
  }

  async fn unsubscribe(&self, subscription: Subscription) -> Result<()> {
    let active = self
      .subscriptions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&subscription.id());

    let Some(active) = active else {
      return Ok(());
    };
    active.cancel.cancel();
    active.task.await.map_err(Error::Task)?;

    info!(subscription = subscription.id(), "subscription released");
    Ok(())
  }
}
