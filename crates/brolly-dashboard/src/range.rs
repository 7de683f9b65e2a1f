//! Date-range reads over collections with an ISO `date` field.

use std::sync::Arc;

use brolly_core::{
  document::Document,
  query::{Filter, FilterOp, Query},
  store::DocumentStore,
};
use chrono::NaiveDate;

use crate::{Result, error::annotate};

/// The ordered field range filters apply to.
pub const RANGE_FIELD: &str = "date";

/// Build a query for documents dated within `[start, end]`. A missing bound
/// leaves that side open.
pub fn range_query(
  collection: &str,
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
  limit: usize,
) -> Query {
  let iso = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
  let mut query = Query::collection(collection).limit(limit);
  if let Some(start) = start {
    query = query.filter(Filter::new(RANGE_FIELD, FilterOp::Ge, iso(start)));
  }
  if let Some(end) = end {
    query = query.filter(Filter::new(RANGE_FIELD, FilterOp::Le, iso(end)));
  }
  query
}

pub struct RangeReader<S> {
  store: Arc<S>,
}

impl<S: DocumentStore> RangeReader<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// At most `limit` documents in store order; no secondary sort is applied.
  /// An empty result is not an error.
  pub async fn read_range(
    &self,
    collection: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    limit: usize,
  ) -> Result<Vec<Document>> {
    let query = range_query(collection, start, end, limit);
    self.store.query(&query).await.map_err(annotate("read_range"))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn only_present_bounds_become_filters() {
    let q = range_query("london_weather", None, None, 100);
    assert!(q.filters.is_empty());
    assert_eq!(q.limit, Some(100));

    let q = range_query("london_weather", Some(date("2020-01-01")), None, 5);
    assert_eq!(q.filters, [Filter::new("date", FilterOp::Ge, json!("2020-01-01"))]);

    let q = range_query("london_weather", Some(date("2020-01-01")), Some(date("2020-12-31")), 5);
    assert_eq!(q.filters.len(), 2);
    assert_eq!(q.filters[1].op, FilterOp::Le);
    assert_eq!(q.filters[1].value, json!("2020-12-31"));
  }
}
