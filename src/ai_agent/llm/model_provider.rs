use serde::{Serialize, Deserialize};
use std::str::FromStr;
use std::fmt;
use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;

use crate::ai_agent::llm::error::LLMError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelProvider {
  Gemini,
  Groq,
}

impl ModelProvider {

  pub fn as_str(&self) -> &'static str {
    match self {
      &ModelProvider::Gemini => "Gemini",
      &ModelProvider::Groq => "Groq",
    }
  }

  pub fn default_base_url(&self) -> &'static str {
    match self {
      &ModelProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
      &ModelProvider::Groq => "https://api.groq.com/openai/v1",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMModelConfig {
  pub provider: ModelProvider,
  pub model_name: String,
  #[serde(skip_serializing)]
  pub api_key: String,
  pub base_url: Option<String>, // Useful for proxies or self-hosted gateways
  pub temperature: Option<f32>,
  pub max_tokens: Option<u32>,
  pub top_p : Option<f32>
}

impl LLMModelConfig {
  pub fn new(provider: ModelProvider, model_name: &str, api_key: &str) -> Self {
    LLMModelConfig {
      provider,
      model_name: model_name.to_string(),
      api_key: api_key.to_string(),
      base_url: None,
      temperature: None,
      max_tokens: None,
      top_p: None,
    }
  }

  pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
    self.base_url = base_url;
    return self;
  }

  pub fn base_url(&self) -> String {
    let url = self.base_url.clone().unwrap_or_else(|| self.provider.default_base_url().to_string());
    url.trim_end_matches('/').to_string()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::System => "system",
      Role::User => "user",
      Role::Assistant => "assistant",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    ChatMessage { role: Role::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    ChatMessage { role: Role::Assistant, content: content.into() }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
  pub content: String,
}

impl fmt::Display for ModelProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ModelProvider {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "gemini" | "google" => Ok(ModelProvider::Gemini),
      "groq" => Ok(ModelProvider::Groq),
      _ => Err(format!("Unknown model provider: {}", s)),
    }
  }
}

/// Lazy, finite, non-restartable sequence of response text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

#[async_trait]
pub trait LLMChatter : Send + Sync {
  async fn chat(&self, messages: Vec<ChatMessage>, config : &LLMModelConfig) -> Result<LLMResponse, LLMError>;

  async fn chat_stream(&self, messages: Vec<ChatMessage>, config : &LLMModelConfig) -> Result<FragmentStream, LLMError>;
}
