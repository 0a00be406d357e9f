use calamine::{open_workbook_auto_from_rs, Data, Reader};
use polars::prelude::{DataFrame, DataType, NamedFrom, PolarsError, Series};
use serde_json::Value;
use std::io::Cursor;

use crate::ai_agent::data::error::StatementError;
use crate::ai_agent::data::models::LineItem;

pub const LABEL: &str = "label";
pub const PRIOR: &str = "prior";
pub const CURRENT: &str = "current";
const COLUMNS: usize = 3;

impl From<PolarsError> for StatementError {
  fn from(e: PolarsError) -> Self {
    StatementError::Unreadable(e.to_string())
  }
}

fn cell_text(cell: &Data) -> Option<String> {
  match cell {
    Data::Empty | Data::Error(_) => None,
    Data::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

fn json_text(value: &Value) -> Option<String> {
  match value {
    Value::Null | Value::Array(_) | Value::Object(_) => None,
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
  }
}

/// Builds the raw three-column frame. Columns are named by position; any header text is ignored.
/// Rows with no content at all are dropped.
pub fn frame_from_text(rows: Vec<Vec<Option<String>>>) -> Result<DataFrame, StatementError> {
  let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
  if width != COLUMNS {
    return Err(StatementError::ColumnCount { found: width });
  }

  let mut labels: Vec<Option<String>> = Vec::with_capacity(rows.len());
  let mut prior: Vec<Option<String>> = Vec::with_capacity(rows.len());
  let mut current: Vec<Option<String>> = Vec::with_capacity(rows.len());

  for row in rows.into_iter().filter(|row| row.iter().any(Option::is_some)) {
    let mut cells = row.into_iter();
    labels.push(cells.next().flatten());
    prior.push(cells.next().flatten());
    current.push(cells.next().flatten());
  }

  let df = DataFrame::new(vec![
    Series::new(LABEL, &labels),
    Series::new(PRIOR, &prior),
    Series::new(CURRENT, &current),
  ])?;
  return Ok(df);
}

/// Spreadsheet rows as read: the first row is the header and is skipped.
pub fn frame_from_cells(rows: &[Vec<Data>]) -> Result<DataFrame, StatementError> {
  let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
  if width != COLUMNS {
    return Err(StatementError::ColumnCount { found: width });
  }
  let body: Vec<Vec<Option<String>>> = rows.iter().skip(1)
    .map(|row| row.iter().map(cell_text).collect())
    .collect();
  if body.is_empty() {
    let df = DataFrame::new(vec![
      Series::new(LABEL, &Vec::<Option<String>>::new()),
      Series::new(PRIOR, &Vec::<Option<String>>::new()),
      Series::new(CURRENT, &Vec::<Option<String>>::new()),
    ])?;
    return Ok(df);
  }
  frame_from_text(body)
}

/// JSON rows `[label, prior, current]`, no header row.
pub fn frame_from_json(rows: &[Vec<Value>]) -> Result<DataFrame, StatementError> {
  let text: Vec<Vec<Option<String>>> = rows.iter()
    .map(|row| row.iter().map(json_text).collect())
    .collect();
  frame_from_text(text)
}

/// Reads the first worksheet of an `.xlsx` or `.xls` workbook.
pub fn read_statement(bytes: &[u8]) -> Result<DataFrame, StatementError> {
  let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
    .map_err(|e| StatementError::Unreadable(e.to_string()))?;

  let range = match workbook.worksheet_range_at(0) {
    Some(Ok(range)) => range,
    Some(Err(e)) => return Err(StatementError::Unreadable(e.to_string())),
    None => return Err(StatementError::Unreadable("the workbook has no worksheets".to_string())),
  };

  let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
  log::info!("Read worksheet with {} rows x {} columns", range.height(), range.width());
  frame_from_cells(&rows)
}

/// Surrounding whitespace does not stop a text cell from counting as a number.
fn coerce_numeric(series: &Series) -> Result<Vec<f64>, PolarsError> {
  let trimmed = match series.dtype() {
    DataType::String => {
      let cells: Vec<Option<&str>> = series.str()?.into_iter().map(|cell| cell.map(str::trim)).collect();
      Series::new(series.name(), &cells)
    }
    _ => series.clone(),
  };
  let numbers = trimmed.cast(&DataType::Float64)?;
  let values = numbers.f64()?.into_iter()
    .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
    .collect();
  return Ok(values);
}

/// Names the columns positionally and coerces both value columns to numbers;
/// anything that does not parse becomes 0.
pub fn line_items(df: &DataFrame) -> Result<Vec<LineItem>, StatementError> {
  if df.width() != COLUMNS {
    return Err(StatementError::ColumnCount { found: df.width() });
  }
  let mut df = df.clone();
  df.set_column_names(&[LABEL, PRIOR, CURRENT])?;

  let labels = df.column(LABEL)?.cast(&DataType::String)?;
  let prior = coerce_numeric(df.column(PRIOR)?)?;
  let current = coerce_numeric(df.column(CURRENT)?)?;

  let items: Vec<LineItem> = labels.str()?.into_iter()
    .zip(prior.into_iter().zip(current.into_iter()))
    .map(|(label, (prior_value, current_value))| LineItem::new(label.unwrap_or_default(), prior_value, current_value))
    .collect();
  return Ok(items);
}
