use std::sync::Arc;
use serde::Serialize;
use serde_json::Value;
use futures::channel::mpsc::UnboundedReceiver;

use crate::ai_agent::agents::chat::ChatRender;
use crate::ai_agent::llm::model_provider::{ChatMessage, ModelProvider};
use crate::ai_agent::llm::models::{get_models_for, LLMModel};
use crate::app::error::AppError;
use crate::app::services::service::{NarrativeReport, StatementReport, StatementServices};
use crate::app::services::session_service::SessionSummary;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderModels {
  pub provider: ModelProvider,
  pub models: Vec<LLMModel>,
}

pub struct StatementController {
  services: Arc<StatementServices>,
}

fn logged<T>(action: &str, result: Result<T, AppError>) -> Result<T, AppError> {
  if let Err(e) = &result {
    match e {
      AppError::Internal(_) => log::error!("{} failed: {}", action, e),
      _ => log::warn!("{} failed: {}", action, e),
    }
  }
  result
}

impl StatementController {
  pub fn new(services: Arc<StatementServices>) -> Self {
    StatementController { services }
  }

  pub fn get_available_models(&self) -> Vec<ProviderModels> {
    [ModelProvider::Gemini, ModelProvider::Groq].into_iter()
      .map(|provider| ProviderModels { provider, models: get_models_for(provider).into_iter().cloned().collect() })
      .collect()
  }

  pub async fn start_session(&self, api_key: Option<String>) -> Result<SessionSummary, AppError> {
    logged("Start session", self.services.sessions().start_session(api_key.as_deref()))
  }

  pub async fn end_session(&self, session_id: &str) -> Result<(), AppError> {
    logged("End session", self.services.sessions().end_session(session_id))
  }

  pub async fn transcript(&self, session_id: &str) -> Result<Vec<ChatMessage>, AppError> {
    logged("Transcript", self.services.transcript(session_id).await)
  }

  pub async fn upload_statement(&self, session_id: &str, bytes: &[u8]) -> Result<StatementReport, AppError> {
    log::info!("Session {}: received a {} byte statement", session_id, bytes.len());
    logged("Statement upload", self.services.upload_statement(session_id, bytes).await)
  }

  pub async fn upload_rows(&self, session_id: &str, rows: Vec<Vec<Value>>) -> Result<StatementReport, AppError> {
    log::info!("Session {}: received {} statement rows", session_id, rows.len());
    logged("Statement upload", self.services.upload_rows(session_id, &rows).await)
  }

  pub async fn narrative(&self, session_id: &str) -> Result<NarrativeReport, AppError> {
    logged("Narrative", self.services.request_narrative(session_id).await)
  }

  pub fn chat(&self, session_id: &str, message: String) -> Result<UnboundedReceiver<ChatRender>, AppError> {
    logged("Chat", self.services.chat(session_id, message))
  }
}
