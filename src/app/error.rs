use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::ai_agent::data::error::StatementError;

/// Failures that stop one flow for one caller; the process keeps serving.
#[derive(Error, Debug)]
pub enum AppError {
  #[error("{0}")]
  Structural(#[from] StatementError),

  #[error("Please enter an API key or configure one on the server to start.")]
  CredentialMissing,

  #[error("Unknown session: {0}")]
  SessionNotFound(String),

  #[error("Upload a financial statement before requesting an analysis.")]
  NoStatement,

  #[error("Internal error: {0}")]
  Internal(#[from] anyhow::Error),
}

impl AppError {
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Structural(_) => "structural_input",
      AppError::CredentialMissing => "credential_missing",
      AppError::SessionNotFound(_) => "session_not_found",
      AppError::NoStatement => "no_statement",
      AppError::Internal(_) => "internal",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Structural(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::CredentialMissing => StatusCode::UNAUTHORIZED,
      AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
      AppError::NoStatement => StatusCode::CONFLICT,
      AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    HttpResponse::build(self.status_code()).json(serde_json::json!({
      "error": self.to_string(),
      "kind": self.kind(),
      "code": self.status_code().as_u16(),
    }))
  }
}
