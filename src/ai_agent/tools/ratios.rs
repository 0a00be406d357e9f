//! Growth and asset-composition ratios for a two-period statement.
//!
//! Pure functions: no I/O, and the same rows always produce the same table.

use crate::ai_agent::data::error::StatementError;
use crate::ai_agent::data::models::{label_matches, DerivedRow, DerivedTable, LineItem, MarkerSet, MetricNotice, Period};

/// Stand-in for an exact-zero divisor so percentages stay finite.
pub const EPSILON: f64 = 1e-9;

fn divisor(value: f64) -> f64 {
  if value == 0.0 { EPSILON } else { value }
}

fn numeric(value: f64) -> f64 {
  if value.is_finite() { value } else { 0.0 }
}

/// Keeps a computed percentage finite: overflow saturates, NaN becomes 0.
fn saturate(value: f64) -> f64 {
  if value.is_nan() {
    0.0
  } else if value.is_infinite() {
    f64::MAX.copysign(value)
  } else {
    value
  }
}

pub fn growth_pct(prior: f64, current: f64) -> f64 {
  saturate((current - prior) / divisor(prior) * 100.0)
}

pub fn share_pct(value: f64, total: f64) -> f64 {
  saturate(value / divisor(total) * 100.0)
}

/// Derives growth and share percentages for every row, in input order.
///
/// The total-assets row is the first row whose label contains `markers.total_assets`
/// (case-insensitive). Later matches are ignored and reported as a notice. Fails only
/// when no row matches.
pub fn derive(rows: &[LineItem], markers: &MarkerSet) -> Result<DerivedTable, StatementError> {
  let items: Vec<LineItem> = rows.iter()
    .map(|row| LineItem { label: row.label.clone(), prior_value: numeric(row.prior_value), current_value: numeric(row.current_value) })
    .collect();

  let mut notices: Vec<MetricNotice> = Vec::new();

  let matches: Vec<&LineItem> = items.iter().filter(|row| label_matches(&row.label, &markers.total_assets)).collect();
  let total = match matches.first() {
    Some(total) => *total,
    None => return Err(StatementError::MissingMarker { marker: markers.total_assets.clone() }),
  };
  if matches.len() > 1 {
    log::warn!("{} rows match '{}', using the first", matches.len(), markers.total_assets);
    notices.push(MetricNotice::DuplicateMarker { marker: markers.total_assets.clone(), matches: matches.len() });
  }

  let total_assets_prior = total.prior_value;
  let total_assets_current = total.current_value;
  if total_assets_prior == 0.0 {
    notices.push(MetricNotice::ZeroTotalAssets { period: Period::Prior });
  }
  if total_assets_current == 0.0 {
    notices.push(MetricNotice::ZeroTotalAssets { period: Period::Current });
  }

  let derived_rows: Vec<DerivedRow> = items.into_iter().map(|item| DerivedRow {
    growth_pct: growth_pct(item.prior_value, item.current_value),
    prior_share_pct: share_pct(item.prior_value, total_assets_prior),
    current_share_pct: share_pct(item.current_value, total_assets_current),
    label: item.label,
    prior_value: item.prior_value,
    current_value: item.current_value,
  }).collect();

  log::debug!("Derived {} rows, total assets {} -> {}", derived_rows.len(), total_assets_prior, total_assets_current);

  return Ok(DerivedTable { rows: derived_rows, total_assets_prior, total_assets_current, notices });
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Vec<LineItem> {
    vec![
      LineItem::new("TOTAL ASSETS", 1000.0, 1200.0),
      LineItem::new("SHORT-TERM ASSETS", 400.0, 500.0),
      LineItem::new("SHORT-TERM LIABILITIES", 200.0, 250.0),
    ]
  }

  fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
  }

  #[test]
  fn reference_statement() {
    let table = derive(&sample(), &MarkerSet::english()).unwrap();
    assert_eq!(round2(table.rows[0].growth_pct), 20.00);
    assert_eq!(round2(table.rows[1].prior_share_pct), 40.00);
    assert_eq!(round2(table.rows[1].current_share_pct), 41.67);
    assert_eq!(table.rows[0].prior_share_pct, 100.0);
    assert!(table.notices.is_empty());
  }

  #[test]
  fn zero_prior_value_gives_large_finite_growth() {
    let mut rows = sample();
    rows.push(LineItem::new("Intangibles", 0.0, 50.0));
    let table = derive(&rows, &MarkerSet::english()).unwrap();
    let growth = table.rows[3].growth_pct;
    assert!(growth.is_finite());
    assert!(growth > 1e12);
  }

  #[test]
  fn growth_is_always_finite() {
    let rows = vec![
      LineItem::new("Total assets", 0.0, 0.0),
      LineItem::new("Huge", 0.0, f64::MAX),
      LineItem::new("Negative huge", 0.0, -f64::MAX),
      LineItem::new("Not a number", f64::NAN, f64::INFINITY),
    ];
    let table = derive(&rows, &MarkerSet::english()).unwrap();
    for row in &table.rows {
      assert!(row.growth_pct.is_finite(), "{}", row.label);
      assert!(row.prior_share_pct.is_finite(), "{}", row.label);
      assert!(row.current_share_pct.is_finite(), "{}", row.label);
    }
    assert_eq!(table.rows[3].prior_value, 0.0);
    assert_eq!(table.rows[3].current_value, 0.0);
    assert!(table.rows[2].growth_pct < 0.0);
  }

  #[test]
  fn missing_total_assets_is_structural() {
    let rows = vec![LineItem::new("Cash", 1.0, 2.0)];
    let err = derive(&rows, &MarkerSet::english()).unwrap_err();
    assert_eq!(err, StatementError::MissingMarker { marker: "TOTAL ASSETS".to_string() });
    assert!(derive(&[], &MarkerSet::english()).is_err());
  }

  #[test]
  fn first_total_assets_match_wins() {
    let rows = vec![
      LineItem::new("Cash", 100.0, 100.0),
      LineItem::new("Total assets", 500.0, 1000.0),
      LineItem::new("TOTAL ASSETS (restated)", 50.0, 50.0),
    ];
    let table = derive(&rows, &MarkerSet::english()).unwrap();
    assert_eq!(table.total_assets_prior, 500.0);
    assert_eq!(table.rows[0].prior_share_pct, 20.0);
    assert_eq!(table.notices, vec![MetricNotice::DuplicateMarker { marker: "TOTAL ASSETS".to_string(), matches: 2 }]);
  }

  #[test]
  fn zero_total_assets_is_guarded_and_noted() {
    let rows = vec![LineItem::new("Total assets", 0.0, 10.0), LineItem::new("Cash", 1.0, 5.0)];
    let table = derive(&rows, &MarkerSet::english()).unwrap();
    assert_eq!(table.rows[1].prior_share_pct, 1.0 / EPSILON * 100.0);
    assert_eq!(table.rows[1].current_share_pct, 50.0);
    assert_eq!(table.notices, vec![MetricNotice::ZeroTotalAssets { period: Period::Prior }]);
  }

  #[test]
  fn permuting_other_rows_leaves_each_row_unchanged() {
    let rows = vec![
      LineItem::new("Cash", 10.0, 20.0),
      LineItem::new("TOTAL ASSETS", 1000.0, 1200.0),
      LineItem::new("Inventory", 300.0, 150.0),
      LineItem::new("Receivables", 0.0, 75.0),
    ];
    let mut permuted = rows.clone();
    permuted.swap(0, 3);
    permuted.swap(2, 3);

    let original = derive(&rows, &MarkerSet::english()).unwrap();
    let shuffled = derive(&permuted, &MarkerSet::english()).unwrap();
    for row in &original.rows {
      let other = shuffled.rows.iter().find(|r| r.label == row.label).unwrap();
      assert_eq!(row, other);
    }
    let labels: Vec<&str> = shuffled.rows.iter().map(|r| r.label.as_str()).collect();
    let expected: Vec<&str> = permuted.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, expected);
  }

  #[test]
  fn derivation_is_deterministic() {
    let a = derive(&sample(), &MarkerSet::english()).unwrap();
    let b = derive(&sample(), &MarkerSet::english()).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn vietnamese_markers() {
    let rows = vec![
      LineItem::new("TỔNG CỘNG TÀI SẢN", 200.0, 300.0),
      LineItem::new("A. Tài sản ngắn hạn", 100.0, 150.0),
    ];
    let table = derive(&rows, &MarkerSet::vietnamese()).unwrap();
    assert_eq!(table.rows[1].prior_share_pct, 50.0);
    assert!(derive(&rows, &MarkerSet::english()).is_err());
  }
}
