use crate::ai_agent::llm::error::LLMError;
use crate::ai_agent::llm::model_provider::{ChatMessage, FragmentStream, LLMChatter, LLMModelConfig, LLMResponse, Role};
use crate::ai_agent::llm::sse;

use reqwest::{header::{HeaderMap, HeaderValue, CONTENT_TYPE}, Client, Response};
use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use futures::StreamExt;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct GeminiPart {
  #[serde(default)]
  text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct GeminiContent {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_output_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  top_p: Option<f32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<GeminiContent>,
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<GeminiContent>,
  generation_config: GenerationConfig,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
  #[serde(default)]
  content: Option<GeminiContent>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
  #[serde(default)]
  block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<GeminiCandidate>,
  #[serde(default)]
  prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorBody {
  error: GeminiErrorDetail,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorDetail {
  #[serde(default)]
  code: u16,
  #[serde(default)]
  message: String,
  #[serde(default)]
  status: String,
}

impl GenerateContentResponse {
  fn text(self) -> Result<String, LLMError> {
    if self.candidates.is_empty() {
      if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LLMError::Malformed(format!("prompt blocked by the provider ({})", reason)));
      }
    }
    let text: String = self.candidates.into_iter()
      .take(1)
      .filter_map(|c| c.content)
      .flat_map(|c| c.parts.into_iter())
      .map(|p| p.text)
      .collect();
    return Ok(text);
  }
}

/// Gemini names the assistant role "model" and carries system prompts separately.
fn to_request(messages: Vec<ChatMessage>, config: &LLMModelConfig) -> GenerateContentRequest {
  let mut contents: Vec<GeminiContent> = Vec::new();
  let mut system_parts: Vec<GeminiPart> = Vec::new();

  for message in messages {
    let part = GeminiPart { text: message.content };
    match message.role {
      Role::System => system_parts.push(part),
      Role::User => contents.push(GeminiContent { role: Some("user".to_string()), parts: vec![part] }),
      Role::Assistant => contents.push(GeminiContent { role: Some("model".to_string()), parts: vec![part] }),
    }
  }

  let system_instruction = if system_parts.is_empty() { None } else { Some(GeminiContent { role: None, parts: system_parts }) };

  GenerateContentRequest {
    contents,
    system_instruction,
    generation_config: GenerationConfig {
      temperature: config.temperature,
      max_output_tokens: config.max_tokens,
      top_p: config.top_p,
    },
  }
}

fn parse_error_body(status: u16, body: String) -> LLMError {
  match serde_json::from_str::<GeminiErrorBody>(&body) {
    Ok(parsed) => {
      let code = if parsed.error.code == 0 { status } else { parsed.error.code };
      LLMError::from_status(code, format!("{} {}", parsed.error.status, parsed.error.message).trim().to_string())
    }
    Err(_) => LLMError::from_status(status, body),
  }
}

fn parse_stream_event(data: &str) -> Result<String, LLMError> {
  if let Ok(error) = serde_json::from_str::<GeminiErrorBody>(data) {
    return Err(LLMError::from_status(error.error.code, error.error.message));
  }
  let chunk: GenerateContentResponse = serde_json::from_str(data)?;
  return chunk.text();
}

pub struct GeminiProvider {
  client: Client,
}

impl GeminiProvider {
  pub fn new() -> Self {
    GeminiProvider { client: Client::new() }
  }

  async fn send(&self, messages: Vec<ChatMessage>, config: &LLMModelConfig, method: &str) -> Result<Response, LLMError> {
    let request = to_request(messages, config);
    let url = format!("{}/models/{}:{}", config.base_url(), config.model_name, method);

    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(&config.api_key)
      .map_err(|_| LLMError::Unauthorized("API key contains characters that cannot be sent in a header".to_string()))?;
    headers.insert("x-goog-api-key", key);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    log::debug!("Gemini request: {} ({} contents)", url, request.contents.len());
    let response: Response = self.client.post(&url).headers(headers).json(&request).send().await?;

    if response.status().is_success() {
      return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    log::error!("Error getting response from Gemini: {}", status);
    return Err(parse_error_body(status, body));
  }
}

#[async_trait]
impl LLMChatter for GeminiProvider {
  async fn chat(&self, messages: Vec<ChatMessage>, config: &LLMModelConfig) -> Result<LLMResponse, LLMError> {
    let response = self.send(messages, config, "generateContent").await?;
    let parsed: GenerateContentResponse = response.json().await?;
    let content = parsed.text()?;
    if content.is_empty() {
      return Err(LLMError::Malformed("No candidates received from Gemini".to_string()));
    }
    return Ok(LLMResponse { content });
  }

  async fn chat_stream(&self, messages: Vec<ChatMessage>, config: &LLMModelConfig) -> Result<FragmentStream, LLMError> {
    let response = self.send(messages, config, "streamGenerateContent?alt=sse").await?;
    let fragments = sse::data_events(Box::pin(response.bytes_stream()))
      .map(|event| event.and_then(|data| parse_stream_event(&data)))
      .filter(|fragment| futures::future::ready(!matches!(fragment, Ok(text) if text.is_empty())));
    return Ok(Box::pin(fragments));
  }
}
