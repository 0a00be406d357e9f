use serde::{Serialize, Deserialize};

use crate::ai_agent::data::models::{DerivedRow, DerivedTable, LiquidityRatios, Ratio};

/// `1234567.4` -> `1,234,567`. Rounded to whole units.
pub fn format_thousands(value: f64) -> String {
  let rounded = format!("{:.0}", value);
  let (sign, digits) = match rounded.strip_prefix('-') {
    Some(rest) => ("-", rest),
    None => ("", rounded.as_str()),
  };
  if digits == "0" {
    return "0".to_string();
  }

  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }
  format!("{}{}", sign, grouped)
}

pub fn format_pct(value: f64) -> String {
  format!("{:.2}%", value)
}

pub fn format_ratio(ratio: &Ratio) -> String {
  match ratio {
    Ratio::Available(v) => format!("{:.2} times", v),
    Ratio::Unavailable => "N/A".to_string(),
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
  pub label: String,
  pub prior_value: String,
  pub current_value: String,
  pub growth_pct: String,
  pub prior_share_pct: String,
  pub current_share_pct: String,
}

impl From<&DerivedRow> for DisplayRow {
  fn from(row: &DerivedRow) -> Self {
    DisplayRow {
      label: row.label.clone(),
      prior_value: format_thousands(row.prior_value),
      current_value: format_thousands(row.current_value),
      growth_pct: format_pct(row.growth_pct),
      prior_share_pct: format_pct(row.prior_share_pct),
      current_share_pct: format_pct(row.current_share_pct),
    }
  }
}

/// The two current-ratio metrics as shown side by side, with the change on the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityDisplay {
  pub prior_label: String,
  pub prior_value: String,
  pub current_label: String,
  pub current_value: String,
  pub delta: Option<String>,
}

impl From<&LiquidityRatios> for LiquidityDisplay {
  fn from(ratios: &LiquidityRatios) -> Self {
    LiquidityDisplay {
      prior_label: "Current ratio (prior period)".to_string(),
      prior_value: format_ratio(&ratios.prior),
      current_label: "Current ratio (current period)".to_string(),
      current_value: format_ratio(&ratios.current),
      delta: ratios.delta().map(|d| format!("{:.2}", d)),
    }
  }
}

fn escape_cell(text: &str) -> String {
  text.replace('|', "\\|").replace('\n', " ")
}

/// Markdown table of the derived statement, one line per row in table order.
pub fn derived_table_markdown(table: &DerivedTable) -> String {
  let mut out = String::new();
  out.push_str("| Line item | Prior period | Current period | Growth (%) | Prior share (%) | Current share (%) |\n");
  out.push_str("|:--|--:|--:|--:|--:|--:|\n");
  for row in &table.rows {
    let display = DisplayRow::from(row);
    out.push_str(&format!(
      "| {} | {} | {} | {} | {} | {} |\n",
      escape_cell(&display.label), display.prior_value, display.current_value,
      display.growth_pct, display.prior_share_pct, display.current_share_pct
    ));
  }
  out
}
