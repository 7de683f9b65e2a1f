//! Integration tests for `SqliteStore` against an in-memory database.

use std::{sync::Arc, time::Duration};

use brolly_core::{
  Error,
  change::{ChangeKind, ChangeSet},
  document::Fields,
  query::{Direction, Filter, FilterOp, Query},
  store::DocumentStore,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fields(value: Value) -> Fields {
  match value {
    Value::Object(map) => map,
    other => panic!("not an object: {other}"),
  }
}

fn day(date: &str, mean_temp: f64) -> Fields {
  fields(json!({ "date": date, "mean_temp": mean_temp }))
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn set_and_get_document() {
  let s = store().await;
  s.set_document("user_preferences", "u1", fields(json!({ "temperature_unit": "Celsius" })))
    .await
    .unwrap();

  let doc = s.get_document("user_preferences", "u1").await.unwrap().unwrap();
  assert_eq!(doc.key, "u1");
  assert_eq!(doc.get("temperature_unit"), Some(&json!("Celsius")));
}

#[tokio::test]
async fn get_missing_document_returns_none() {
  let s = store().await;
  assert!(s.get_document("user_preferences", "nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn set_replaces_whole_document() {
  let s = store().await;
  s.set_document("c", "k", fields(json!({ "a": 1, "b": 2 }))).await.unwrap();
  s.set_document("c", "k", fields(json!({ "a": 3 }))).await.unwrap();

  let doc = s.get_document("c", "k").await.unwrap().unwrap();
  assert_eq!(doc.fields, fields(json!({ "a": 3 })));
}

#[tokio::test]
async fn collections_are_isolated() {
  let s = store().await;
  s.set_document("a", "k", fields(json!({ "v": 1 }))).await.unwrap();
  assert!(s.get_document("b", "k").await.unwrap().is_none());
}

#[tokio::test]
async fn update_merges_fields() {
  let s = store().await;
  s.set_document("c", "k", fields(json!({ "a": 1, "b": 2 }))).await.unwrap();
  s.update_document("c", "k", fields(json!({ "b": 5, "c": 6 }))).await.unwrap();

  let doc = s.get_document("c", "k").await.unwrap().unwrap();
  assert_eq!(doc.fields, fields(json!({ "a": 1, "b": 5, "c": 6 })));
}

#[tokio::test]
async fn update_missing_document_is_not_found() {
  let s = store().await;
  let err = s
    .update_document("c", "ghost", fields(json!({ "a": 1 })))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { ref key, .. } if key == "ghost"));
  assert!(s.get_document("c", "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn create_refuses_to_overwrite() {
  let s = store().await;
  s.create_document("c", "k", fields(json!({ "n": 1 }))).await.unwrap();
  let err = s
    .create_document("c", "k", fields(json!({ "n": 2 })))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AlreadyExists { .. }));

  let doc = s.get_document("c", "k").await.unwrap().unwrap();
  assert_eq!(doc.get("n"), Some(&json!(1)));
}

#[tokio::test]
async fn delete_is_idempotent() {
  let s = store().await;
  s.set_document("c", "k", Fields::new()).await.unwrap();
  s.delete_document("c", "k").await.unwrap();
  s.delete_document("c", "k").await.unwrap();
  assert!(s.get_document("c", "k").await.unwrap().is_none());
}

// ─── Queries ─────────────────────────────────────────────────────────────────

async fn seeded() -> SqliteStore {
  let s = store().await;
  for (date, t) in [("2020-01-01", 4.0), ("2020-01-02", 5.5), ("2020-01-03", 7.0), ("2020-02-01", 3.0)] {
    s.set_document("london_weather", date, day(date, t)).await.unwrap();
  }
  s
}

#[tokio::test]
async fn range_filters_are_inclusive() {
  let s = seeded().await;
  let q = Query::collection("london_weather")
    .filter(Filter::new("date", FilterOp::Ge, "2020-01-02"))
    .filter(Filter::new("date", FilterOp::Le, "2020-01-03"));

  let docs = s.query(&q).await.unwrap();
  let keys: Vec<_> = docs.iter().map(|d| d.key.as_str()).collect();
  assert_eq!(keys, ["2020-01-02", "2020-01-03"]);
}

#[tokio::test]
async fn numeric_filter_and_limit() {
  let s = seeded().await;
  let q = Query::collection("london_weather")
    .filter(Filter::new("mean_temp", FilterOp::Gt, 3.5))
    .limit(2);
  let docs = s.query(&q).await.unwrap();
  assert_eq!(docs.len(), 2);
  assert!(docs.iter().all(|d| d.get("mean_temp").unwrap().as_f64().unwrap() > 3.5));
}

#[tokio::test]
async fn order_by_descending() {
  let s = seeded().await;
  let q = Query::collection("london_weather").order_by("mean_temp", Direction::Descending);
  let docs = s.query(&q).await.unwrap();
  let temps: Vec<f64> = docs
    .iter()
    .map(|d| d.get("mean_temp").unwrap().as_f64().unwrap())
    .collect();
  assert_eq!(temps, [7.0, 5.5, 4.0, 3.0]);
}

#[tokio::test]
async fn query_with_no_matches_is_empty() {
  let s = seeded().await;
  let q = Query::collection("london_weather").where_eq("date", "1999-12-31");
  assert!(s.query(&q).await.unwrap().is_empty());
  assert!(s.query(&Query::collection("empty")).await.unwrap().is_empty());
}

#[tokio::test]
async fn filters_only_compare_values_of_the_same_type() {
  let s = store().await;
  let london = fields(json!({ "location": "London", "temperature": "mild", "alert": true }));
  s.set_document("weather_data", "t0", london.clone()).await.unwrap();

  let queries = [
    Query::collection("weather_data").filter(Filter::new("location", FilterOp::Gt, 3)),
    Query::collection("weather_data").filter(Filter::new("temperature", FilterOp::Lt, 100)),
    Query::collection("weather_data").where_eq("alert", 1),
    Query::collection("weather_data").where_eq("location", json!(["London"])),
    Query::collection("weather_data").where_eq("alert", true),
    Query::collection("weather_data").filter(Filter::new("location", FilterOp::Ge, "L")),
  ];
  for q in queries {
    let from_sql = !s.query(&q).await.unwrap().is_empty();
    assert_eq!(from_sql, q.matches(&london), "{:?}", q.filters);
  }
}

// ─── Batches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_applies_all_writes() {
  let s = store().await;
  s.set_document("c", "gone", Fields::new()).await.unwrap();

  let mut batch = s.open_batch();
  batch.set("c", "a", fields(json!({ "n": 1 })));
  batch.set("c", "b", fields(json!({ "n": 2 })));
  batch.delete("c", "gone");

  assert_eq!(s.commit(batch).await.unwrap(), 3);
  assert!(s.get_document("c", "a").await.unwrap().is_some());
  assert!(s.get_document("c", "b").await.unwrap().is_some());
  assert!(s.get_document("c", "gone").await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_batch_is_rejected_without_writes() {
  let s = store().await;
  let mut batch = s.open_batch();
  for i in 0..501 {
    batch.set("c", format!("k{i}"), Fields::new());
  }

  let err = s.commit(batch).await.unwrap_err();
  assert!(matches!(err, Error::BatchTooLarge { size: 501, max: 500 }));
  assert!(s.query(&Query::collection("c")).await.unwrap().is_empty());
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

async fn next(rx: &mut mpsc::UnboundedReceiver<ChangeSet>) -> ChangeSet {
  tokio::time::timeout(Duration::from_secs(5), rx.recv())
    .await
    .expect("delivery timed out")
    .expect("channel closed")
}

fn collector() -> (Arc<dyn Fn(ChangeSet) + Send + Sync>, mpsc::UnboundedReceiver<ChangeSet>) {
  let (tx, rx) = mpsc::unbounded_channel();
  (Arc::new(move |set: ChangeSet| { let _ = tx.send(set); }), rx)
}

#[tokio::test]
async fn subscription_receives_snapshot_then_changes() {
  let s = store().await;
  s.set_document("weather_data", "t0", fields(json!({ "location": "London", "temperature": 9 })))
    .await
    .unwrap();

  let (handler, mut rx) = collector();
  let q = Query::collection("weather_data").where_eq("location", "London");
  let sub = s.subscribe(q, handler).await.unwrap();

  let snapshot = next(&mut rx).await;
  assert_eq!(snapshot.changes.len(), 1);
  assert_eq!(snapshot.changes[0].kind, ChangeKind::Added);

  // Non-matching write is filtered out; matching one is delivered.
  s.set_document("weather_data", "t1", fields(json!({ "location": "Paris", "temperature": 14 })))
    .await
    .unwrap();
  s.set_document("weather_data", "t0", fields(json!({ "location": "London", "temperature": 10 })))
    .await
    .unwrap();

  let set = next(&mut rx).await;
  assert_eq!(set.changes.len(), 1);
  assert_eq!(set.changes[0].kind, ChangeKind::Modified);
  assert_eq!(set.changes[0].document.get("temperature"), Some(&json!(10)));

  s.unsubscribe(sub).await.unwrap();
  assert_eq!(s.active_subscriptions(), 0);
}

#[tokio::test]
async fn no_delivery_after_unsubscribe() {
  let s = store().await;
  let (handler, mut rx) = collector();
  let sub = s.subscribe(Query::collection("weather_data"), handler).await.unwrap();
  let _snapshot = next(&mut rx).await;

  s.unsubscribe(sub).await.unwrap();
  s.set_document("weather_data", "t", fields(json!({ "location": "London" })))
    .await
    .unwrap();

  // The handler (and its sender) were dropped with the task.
  assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn batch_commit_is_delivered_as_one_change_set() {
  let s = store().await;
  let (handler, mut rx) = collector();
  let sub = s.subscribe(Query::collection("london_weather"), handler).await.unwrap();
  let _snapshot = next(&mut rx).await;

  let mut batch = s.open_batch();
  batch.set("london_weather", "2020-01-01", day("2020-01-01", 1.0));
  batch.set("london_weather", "2020-01-02", day("2020-01-02", 2.0));
  s.commit(batch).await.unwrap();

  let set = next(&mut rx).await;
  assert_eq!(set.of_kind(ChangeKind::Added).count(), 2);

  s.delete_document("london_weather", "2020-01-01").await.unwrap();
  let set = next(&mut rx).await;
  assert_eq!(set.changes[0].kind, ChangeKind::Removed);
  assert_eq!(set.changes[0].document.key, "2020-01-01");

  s.unsubscribe(sub).await.unwrap();
}
