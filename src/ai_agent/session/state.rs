use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::ai_agent::data::models::{DerivedTable, LiquidityRatios};
use crate::ai_agent::llm::model_provider::{ChatMessage, LLMChatter, LLMModelConfig, Role};

pub const GREETING: &str = "What else would you like to ask about finance or any other topic?";

/// Append-only, ordered chat history of one session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transcript {
  messages: Vec<ChatMessage>,
}

impl Transcript {
  pub fn new() -> Self {
    Transcript { messages: vec![ChatMessage::assistant(GREETING)] }
  }

  pub fn push(&mut self, message: ChatMessage) {
    log::debug!("Transcript += {} message ({} chars)", message.role.as_str(), message.content.len());
    self.messages.push(message);
  }

  pub fn messages(&self) -> &[ChatMessage] {
    &self.messages
  }

  pub fn len(&self) -> usize {
    self.messages.len()
  }

  pub fn count(&self, role: Role) -> usize {
    self.messages.iter().filter(|m| m.role == role).count()
  }
}

impl Default for Transcript {
  fn default() -> Self {
    Transcript::new()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
  Interactive,
  Configured,
}

/// The last successfully derived statement of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementAnalysis {
  pub table: DerivedTable,
  pub liquidity: LiquidityRatios,
}

/// A model client bound to the model settings it should be called with.
#[derive(Clone)]
pub struct ModelHandle {
  pub client: Arc<dyn LLMChatter>,
  pub config: LLMModelConfig,
}

/// Everything one user session owns. Dropped at session end.
pub struct Session {
  pub id: String,
  pub created_at: DateTime<Utc>,
  pub key_source: KeySource,
  pub analyzer: ModelHandle,
  pub chat: ModelHandle,
  pub transcript: Transcript,
  pub analysis: Option<StatementAnalysis>,
}

impl Session {
  pub fn new(id: String, key_source: KeySource, analyzer: ModelHandle, chat: ModelHandle) -> Self {
    Session {
      id,
      created_at: Utc::now(),
      key_source,
      analyzer,
      chat,
      transcript: Transcript::new(),
      analysis: None,
    }
  }
}
