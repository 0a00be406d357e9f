use crate::ai_agent::llm::error::LLMError;
use crate::ai_agent::llm::model_provider::{ChatMessage, FragmentStream, LLMChatter, LLMModelConfig, LLMResponse};
use crate::ai_agent::llm::sse;

use reqwest::{header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE}, Client, Response};
use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use futures::StreamExt;


#[derive(Serialize, Debug)]
struct GroqChatRequest {
  messages: Vec<ChatMessage>,
  model: String,              // e.g., "llama3-8b-8192"
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
  #[serde(rename = "max_tokens")] // OpenAI compatible APIs often use max_tokens
  #[serde(skip_serializing_if = "Option::is_none")]
  max_completion_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  top_p: Option<f32>,
  stream: bool,
}

#[derive(Deserialize, Debug)]
struct GroqResponseMessage {
  content: String,
}

#[derive(Deserialize, Debug)]
struct GroqChoice {
  message: GroqResponseMessage,
}

#[derive(Deserialize, Debug)]
struct GroqChatResponse {
  choices: Vec<GroqChoice>,
}

#[derive(Deserialize, Debug, Default)]
struct GroqDelta {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GroqStreamChoice {
  #[serde(default)]
  delta: GroqDelta,
}

#[derive(Deserialize, Debug)]
struct GroqStreamChunk {
  #[serde(default)]
  choices: Vec<GroqStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct GroqErrorBody {
  error: GroqErrorDetail,
}

#[derive(Deserialize, Debug)]
struct GroqErrorDetail {
  message: String,
}

pub struct GroqProvider {
  client : Client
}

impl GroqProvider {

  pub fn new() -> Self {
    GroqProvider { client: Client::new() }
  }

  fn headers(&self, config: &LLMModelConfig) -> Result<HeaderMap, LLMError> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
      .map_err(|_| LLMError::Unauthorized("API key contains characters that cannot be sent in a header".to_string()))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    return Ok(headers);
  }

  async fn send(&self, messages: Vec<ChatMessage>, config: &LLMModelConfig, stream: bool) -> Result<Response, LLMError> {
    let request: GroqChatRequest = GroqChatRequest {
      model: config.model_name.clone(),
      messages: messages,
      temperature: config.temperature,
      max_completion_tokens: config.max_tokens,
      top_p: config.top_p,
      stream,
    };

    let url = format!("{}/chat/completions", config.base_url());
    let response: Response = self.client.post(&url).headers(self.headers(config)?).json(&request).send().await?;

    if response.status().is_success() {
      return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    log::error!("Error getting response from Groq: {}", status);
    let message = serde_json::from_str::<GroqErrorBody>(&body).map(|b| b.error.message).unwrap_or(body);
    return Err(LLMError::from_status(status, message));
  }
}

fn parse_stream_chunk(data: &str) -> Result<String, LLMError> {
  let chunk: GroqStreamChunk = serde_json::from_str(data)?;
  let text: String = chunk.choices.into_iter().filter_map(|c| c.delta.content).collect();
  return Ok(text);
}

#[async_trait]
impl LLMChatter for GroqProvider {
  async fn chat(&self, messages: Vec<ChatMessage>, config: &LLMModelConfig) -> Result<LLMResponse, LLMError> {
    let response = self.send(messages, config, false).await?;
    let groq_response : GroqChatResponse = response.json().await?;
    // Pull out the first choice (or fail)
    let first : GroqChoice = groq_response.choices.into_iter().next()
      .ok_or_else(|| LLMError::Malformed("No response choices received from Groq".to_string()))?;
    return Ok(LLMResponse{
      content: first.message.content
    });
  }

  async fn chat_stream(&self, messages: Vec<ChatMessage>, config: &LLMModelConfig) -> Result<FragmentStream, LLMError> {
    let response = self.send(messages, config, true).await?;
    let fragments = sse::data_events(Box::pin(response.bytes_stream()))
      .map(|event| event.and_then(|data| parse_stream_chunk(&data)))
      .filter(|fragment| futures::future::ready(!matches!(fragment, Ok(text) if text.is_empty())));
    return Ok(Box::pin(fragments));
  }
}
