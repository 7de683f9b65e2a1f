//! Post-hoc aggregation over daily weather records.

use std::{collections::BTreeMap, fmt};

use brolly_core::weather::WeatherRecord;
use chrono::{Datelike, NaiveDate};

/// A calendar month; orders chronologically and displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
  pub year:  i32,
  pub month: u32,
}

impl YearMonth {
  pub fn of(date: NaiveDate) -> Self { Self { year: date.year(), month: date.month() } }
}

impl fmt::Display for YearMonth {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}-{:02}", self.year, self.month)
  }
}

/// Mean of `mean_temp` per calendar month.
pub fn monthly_averages<'a>(
  records: impl IntoIterator<Item = &'a WeatherRecord>,
) -> BTreeMap<YearMonth, f64> {
  let mut sums: BTreeMap<YearMonth, (f64, usize)> = BTreeMap::new();
  for record in records {
    let entry = sums.entry(YearMonth::of(record.date)).or_default();
    entry.0 += record.mean_temp;
    entry.1 += 1;
  }
  sums
    .into_iter()
    .map(|(month, (sum, n))| (month, sum / n as f64))
    .collect()
}

/// Descriptive statistics of `mean_temp` over a set of records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSummary {
  pub count: usize,
  pub mean:  f64,
  pub max:   f64,
  pub min:   f64,
}

/// `None` for an empty input.
pub fn summarize<'a>(
  records: impl IntoIterator<Item = &'a WeatherRecord>,
) -> Option<TemperatureSummary> {
  let mut iter = records.into_iter().map(|r| r.mean_temp);
  let first = iter.next()?;
  let mut summary = TemperatureSummary { count: 1, mean: first, max: first, min: first };
  let mut sum = first;
  for t in iter {
    summary.count += 1;
    sum += t;
    summary.max = summary.max.max(t);
    summary.min = summary.min.min(t);
  }
  summary.mean = sum / summary.count as f64;
  Some(summary)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rec(date: &str, t: f64) -> WeatherRecord { WeatherRecord::new(date.parse().unwrap(), t) }

  #[test]
  fn averages_group_by_calendar_month() {
    let records = [
      rec("2020-01-01", 2.0),
      rec("2020-01-31", 4.0),
      rec("2020-02-15", 6.0),
      rec("2019-12-31", 1.0),
    ];
    let avg = monthly_averages(&records);

    let months: Vec<String> = avg.keys().map(ToString::to_string).collect();
    assert_eq!(months, ["2019-12", "2020-01", "2020-02"]);
    assert_eq!(avg[&YearMonth { year: 2020, month: 1 }], 3.0);
    assert_eq!(avg[&YearMonth { year: 2020, month: 2 }], 6.0);
  }

  #[test]
  fn averages_of_nothing_are_empty() {
    assert!(monthly_averages(&[] as &[WeatherRecord]).is_empty());
  }

  #[test]
  fn summary_tracks_extremes() {
    let records = [rec("2020-01-01", -1.5), rec("2020-01-02", 8.5), rec("2020-01-03", 2.0)];
    let s = summarize(&records).unwrap();
    assert_eq!(s.count, 3);
    assert_eq!(s.max, 8.5);
    assert_eq!(s.min, -1.5);
    assert_eq!(s.mean, 3.0);
    assert!(summarize(&[] as &[WeatherRecord]).is_none());
  }
}
