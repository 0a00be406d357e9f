use thiserror::Error;

/// The uploaded statement does not have the shape the ratio engine needs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatementError {
  #[error("Could not find the line item '{marker}' in the statement.")]
  MissingMarker { marker: String },

  #[error("Expected exactly 3 columns (line item | prior period | current period), found {found}.")]
  ColumnCount { found: usize },

  #[error("Could not read the spreadsheet: {0}")]
  Unreadable(String),
}
