//! Filter and query types for collection reads and live subscriptions.
//!
//! A [`Query`] is evaluated by backends natively, and in-process by
//! [`Query::matches`] when a backend needs to test a single document (e.g. to
//! route a committed write to subscribers).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Fields;

// ─── Filters ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
pub enum FilterOp {
  #[strum(serialize = "==")]
  Eq,
  #[strum(serialize = "<")]
  Lt,
  #[strum(serialize = "<=")]
  Le,
  #[strum(serialize = ">")]
  Gt,
  #[strum(serialize = ">=")]
  Ge,
}

impl FilterOp {
  /// The SQL comparison operator for this filter.
  pub fn as_sql(self) -> &'static str {
    match self {
      Self::Eq => "=",
      Self::Lt => "<",
      Self::Le => "<=",
      Self::Gt => ">",
      Self::Ge => ">=",
    }
  }
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
  pub field: String,
  pub op:    FilterOp,
  pub value: Value,
}

impl Filter {
  pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
    Self { field: field.into(), op, value: value.into() }
  }

  pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::new(field, FilterOp::Eq, value)
  }

  /// Evaluate the filter against a document's fields. A missing field or a
  /// value of a different JSON type never matches.
  pub fn matches(&self, fields: &Fields) -> bool {
    let Some(actual) = fields.get(&self.field) else {
      return false;
    };
    let Some(ordering) = compare_values(actual, &self.value) else {
      return false;
    };
    match self.op {
      FilterOp::Eq => ordering == Ordering::Equal,
      FilterOp::Lt => ordering == Ordering::Less,
      FilterOp::Le => ordering != Ordering::Greater,
      FilterOp::Gt => ordering == Ordering::Greater,
      FilterOp::Ge => ordering != Ordering::Less,
    }
  }
}

/// Compare two JSON scalars of the same type.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
    (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
    (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
    _ => None,
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  #[default]
  Ascending,
  Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
  pub field:     String,
  pub direction: Direction,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// A filtered read over one collection. All filters are ANDed together.
///
/// Without an `order_by`, results come back in store-defined order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
  pub collection: String,
  pub filters:    Vec<Filter>,
  pub order_by:   Option<OrderBy>,
  pub limit:      Option<usize>,
}

impl Query {
  pub fn collection(name: impl Into<String>) -> Self {
    Self {
      collection: name.into(),
      filters:    Vec::new(),
      order_by:   None,
      limit:      None,
    }
  }

  pub fn filter(mut self, filter: Filter) -> Self {
    self.filters.push(filter);
    self
  }

  pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.filter(Filter::eq(field, value))
  }

  pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
    self.order_by = Some(OrderBy { field: field.into(), direction });
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Whether a document in this query's collection satisfies every filter.
  pub fn matches(&self, fields: &Fields) -> bool {
    self.filters.iter().all(|f| f.matches(fields))
  }
}
