//! Delivery of committed writes to live subscriptions.
//!
//! Every successful write broadcasts a [`Committed`] record from the database
//! thread. Each subscription owns a task that receives those records, keeps
//! the writes its query cares about, and invokes the handler.

use std::sync::Arc;

use brolly_core::{
  change::{ChangeHandler, ChangeKind, ChangeSet, DocumentChange},
  document::{Document, Fields},
  query::Query,
};
use chrono::{DateTime, Utc};
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Capacity of the commit broadcast channel; slow subscribers beyond this
/// many pending commits lose the oldest ones.
pub const CHANGE_BUFFER: usize = 1024;

/// One document write as seen by the store: contents before and after.
#[derive(Debug, Clone)]
pub struct WrittenDocument {
  pub collection: String,
  pub key:        String,
  pub before:     Option<Fields>,
  pub after:      Option<Fields>,
}

/// Everything applied by a single commit.
#[derive(Debug)]
pub struct Committed {
  pub writes:    Vec<WrittenDocument>,
  pub read_time: DateTime<Utc>,
}

/// Bookkeeping for a registered subscription.
pub struct ActiveSubscription {
  pub cancel: CancellationToken,
  pub task:   JoinHandle<()>,
}

/// Translate a commit into changes relative to `query`.
pub fn changes_for(query: &Query, committed: &Committed) -> Vec<DocumentChange> {
  committed
    .writes
    .iter()
    .filter(|w| w.collection == query.collection)
    .filter_map(|w| {
      let was = w.before.as_ref().filter(|f| query.matches(f));
      let now = w.after.as_ref().filter(|f| query.matches(f));
      let (kind, fields) = match (was, now) {
        (None, Some(after)) => (ChangeKind::Added, after),
        (Some(_), Some(after)) => (ChangeKind::Modified, after),
        (Some(before), None) => (ChangeKind::Removed, before),
        (None, None) => return None,
      };
      Some(DocumentChange {
        kind,
        document: Document::new(w.key.clone(), fields.clone()),
      })
    })
    .collect()
}

/// The body of a subscription task: send the initial snapshot, then forward
/// matching commits until cancelled.
pub async fn deliver(
  id: u64,
  query: Query,
  handler: ChangeHandler,
  initial: Vec<Document>,
  mut rx: broadcast::Receiver<Arc<Committed>>,
  cancel: CancellationToken,
) {
  handler(ChangeSet {
    changes:   initial
      .into_iter()
      .map(|document| DocumentChange { kind: ChangeKind::Added, document })
      .collect(),
    read_time: Utc::now(),
  });

  loop {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => break,
      msg = rx.recv() => match msg {
        Ok(committed) => {
          let changes = changes_for(&query, &committed);
          if changes.is_empty() {
            continue;
          }
          trace!(subscription = id, changes = changes.len(), "delivering change set");
          handler(ChangeSet { changes, read_time: committed.read_time });
        }
        Err(broadcast::error::RecvError::Lagged(missed)) => {
          warn!(subscription = id, missed, "subscriber lagged; commits dropped");
        }
        Err(broadcast::error::RecvError::Closed) => break,
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::{Value, json};

  use super::*;

  fn fields(value: Value) -> Fields {
    match value {
      Value::Object(map) => map,
      _ => unreachable!(),
    }
  }

  fn write(before: Option<Value>, after: Option<Value>) -> WrittenDocument {
    WrittenDocument {
      collection: "weather_data".into(),
      key:        "k".into(),
      before:     before.map(fields),
      after:      after.map(fields),
    }
  }

  fn kinds(writes: Vec<WrittenDocument>) -> Vec<ChangeKind> {
    let query = Query::collection("weather_data").where_eq("location", "London");
    let committed = Committed { writes, read_time: Utc::now() };
    changes_for(&query, &committed).into_iter().map(|c| c.kind).collect()
  }

  #[test]
  fn classifies_relative_to_predicate() {
    let london = json!({ "location": "London" });
    let paris = json!({ "location": "Paris" });

    assert_eq!(kinds(vec![write(None, Some(london.clone()))]), [ChangeKind::Added]);
    assert_eq!(
      kinds(vec![write(Some(london.clone()), Some(london.clone()))]),
      [ChangeKind::Modified]
    );
    assert_eq!(kinds(vec![write(Some(london.clone()), None)]), [ChangeKind::Removed]);
    assert_eq!(
      kinds(vec![write(Some(london.clone()), Some(paris.clone()))]),
      [ChangeKind::Removed]
    );
    assert_eq!(kinds(vec![write(Some(paris.clone()), Some(london))]), [ChangeKind::Added]);
    assert!(kinds(vec![write(None, Some(paris))]).is_empty());
  }

  #[test]
  fn ignores_other_collections() {
    let query = Query::collection("weather_data");
    let committed = Committed {
      writes:    vec![WrittenDocument {
        collection: "user_preferences".into(),
        key:        "u1".into(),
        before:     None,
        after:      Some(Fields::new()),
      }],
      read_time: Utc::now(),
    };
    assert!(changes_for(&query, &committed).is_empty());
  }
}
