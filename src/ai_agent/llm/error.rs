use thiserror::Error;

/// Failure categories reported by a hosted text-generation provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LLMError {
  #[error("rate limit or quota exceeded: {0}")]
  RateLimited(String),

  #[error("the provider rejected the API key: {0}")]
  Unauthorized(String),

  #[error("could not reach the provider: {0}")]
  Transport(String),

  #[error("unexpected response from the provider: {0}")]
  Malformed(String),

  #[error("provider returned status {status}: {message}")]
  Provider { status: u16, message: String },
}

impl LLMError {
  /// Classifies a non-success HTTP status together with the provider's error message.
  pub fn from_status(status: u16, message: String) -> Self {
    let upper = message.to_uppercase();
    match status {
      429 => LLMError::RateLimited(message),
      401 | 403 => LLMError::Unauthorized(message),
      // Gemini answers an invalid key with 400 + API_KEY_INVALID
      400 if upper.contains("API_KEY_INVALID") || upper.contains("API KEY NOT VALID") => LLMError::Unauthorized(message),
      _ if upper.contains("RESOURCE_EXHAUSTED") => LLMError::RateLimited(message),
      _ => LLMError::Provider { status, message },
    }
  }
}

impl From<reqwest::Error> for LLMError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      return LLMError::Malformed(e.to_string());
    }
    if let Some(status) = e.status() {
      return LLMError::from_status(status.as_u16(), e.to_string());
    }
    LLMError::Transport(e.to_string())
  }
}

impl From<serde_json::Error> for LLMError {
  fn from(e: serde_json::Error) -> Self {
    LLMError::Malformed(e.to_string())
  }
}
