use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

/// One row of the uploaded statement, values already coerced to numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
  pub label: String,
  pub prior_value: f64,
  pub current_value: f64,
}

impl LineItem {
  pub fn new(label: &str, prior_value: f64, current_value: f64) -> Self {
    LineItem { label: label.to_string(), prior_value, current_value }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
  pub label: String,
  pub prior_value: f64,
  pub current_value: f64,
  pub growth_pct: f64,
  pub prior_share_pct: f64,
  pub current_share_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
  Prior,
  Current,
}

impl fmt::Display for Period {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Period::Prior => f.write_str("prior period"),
      Period::Current => f.write_str("current period"),
    }
  }
}

/// Degenerate but recoverable conditions met while deriving ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricNotice {
  DuplicateMarker { marker: String, matches: usize },
  ZeroTotalAssets { period: Period },
  MissingLiquidityMarker { marker: String },
  ZeroLiabilities { period: Period },
}

impl fmt::Display for MetricNotice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MetricNotice::DuplicateMarker { marker, matches } =>
        write!(f, "{} rows match '{}'; the first one in file order is used.", matches, marker),
      MetricNotice::ZeroTotalAssets { period } =>
        write!(f, "Total assets are 0 for the {}; asset shares are not meaningful.", period),
      MetricNotice::MissingLiquidityMarker { marker } =>
        write!(f, "Line item '{}' is missing; the current ratio cannot be computed.", marker),
      MetricNotice::ZeroLiabilities { period } =>
        write!(f, "Short-term liabilities are 0 for the {}; the current ratio is reported as 0.", period),
    }
  }
}

/// The statement after growth and share percentages have been appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTable {
  pub rows: Vec<DerivedRow>,
  pub total_assets_prior: f64,
  pub total_assets_current: f64,
  pub notices: Vec<MetricNotice>,
}

impl DerivedTable {
  /// First row whose label contains `marker`, compared case-insensitively.
  pub fn find(&self, marker: &str) -> Option<&DerivedRow> {
    self.rows.iter().find(|row| label_matches(&row.label, marker))
  }
}

pub fn label_matches(label: &str, marker: &str) -> bool {
  label.to_lowercase().contains(&marker.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Ratio {
  Available(f64),
  Unavailable,
}

impl Ratio {
  pub fn value(&self) -> Option<f64> {
    match self {
      Ratio::Available(v) => Some(*v),
      Ratio::Unavailable => None,
    }
  }
}

impl fmt::Display for Ratio {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Ratio::Available(v) => write!(f, "{:.2}", v),
      Ratio::Unavailable => f.write_str("N/A"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityRatios {
  pub prior: Ratio,
  pub current: Ratio,
  pub notices: Vec<MetricNotice>,
}

impl LiquidityRatios {
  /// Change from prior to current, only when both periods are available.
  pub fn delta(&self) -> Option<f64> {
    match (self.prior.value(), self.current.value()) {
      (Some(prior), Some(current)) => Some(current - prior),
      _ => None,
    }
  }
}

/// Marker phrases used to locate line items by label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerSet {
  pub total_assets: String,
  pub short_term_assets: String,
  pub short_term_liabilities: String,
}

impl MarkerSet {
  pub fn english() -> Self {
    MarkerSet {
      total_assets: "TOTAL ASSETS".to_string(),
      short_term_assets: "SHORT-TERM ASSETS".to_string(),
      short_term_liabilities: "SHORT-TERM LIABILITIES".to_string(),
    }
  }

  pub fn vietnamese() -> Self {
    MarkerSet {
      total_assets: "TỔNG CỘNG TÀI SẢN".to_string(),
      short_term_assets: "TÀI SẢN NGẮN HẠN".to_string(),
      short_term_liabilities: "NỢ NGẮN HẠN".to_string(),
    }
  }
}

impl Default for MarkerSet {
  fn default() -> Self {
    MarkerSet::english()
  }
}

impl FromStr for MarkerSet {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "en" | "english" => Ok(MarkerSet::english()),
      "vi" | "vietnamese" => Ok(MarkerSet::vietnamese()),
      _ => Err(format!("Unknown marker set: {}", s)),
    }
  }
}
