use serde::{Serialize, Deserialize};
use std::sync::{Arc, OnceLock};
use anyhow::Result;

use crate::ai_agent::llm::model_provider::{LLMModelConfig, ModelProvider, LLMChatter};
use crate::ai_agent::llm::gemini::GeminiProvider;
use crate::ai_agent::llm::groq::GroqProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMModel {
  pub display_name: String,
  pub model_name: String, // The actual name used in API calls
  pub provider: ModelProvider,
}

impl LLMModel {
  pub fn new(display_name: &str, model_name: &str, provider: ModelProvider) -> Self {
    LLMModel {
      display_name: display_name.to_string(),
      model_name: model_name.to_string(),
      provider,
    }
  }
}

fn available_models_data() -> Vec<LLMModel> {
  vec![
    LLMModel::new("[gemini] gemini-1.5-flash", "gemini-1.5-flash", ModelProvider::Gemini),
    LLMModel::new("[gemini] gemini-1.5-pro", "gemini-1.5-pro", ModelProvider::Gemini),
    LLMModel::new("[gemini] gemini-pro", "gemini-pro", ModelProvider::Gemini),

    LLMModel::new("[groq] llama3-8b", "llama3-8b-8192", ModelProvider::Groq),
    LLMModel::new("[groq] llama3-70b", "llama3-70b-8192", ModelProvider::Groq),
    LLMModel::new("[groq] mixtral-8x7b", "mixtral-8x7b-32768", ModelProvider::Groq),
  ]
}

pub static AVAILABLE_MODELS: OnceLock<Vec<LLMModel>> = OnceLock::new();

pub fn get_available_models() -> &'static [LLMModel] {
  AVAILABLE_MODELS.get_or_init(available_models_data).as_slice()
}

pub fn get_models_for(provider: ModelProvider) -> Vec<&'static LLMModel> {
  get_available_models().iter().filter(|m| m.provider == provider).collect()
}

pub fn get_model_info(model_name: &str) -> Option<&'static LLMModel> {
  get_available_models().iter().find(|&model_desc| model_desc.model_name == model_name)
}

/// Builds the client that talks to a provider. Swappable so the app can run against a scripted model.
pub type ModelFactory = Arc<dyn Fn(&LLMModelConfig) -> Result<Arc<dyn LLMChatter>> + Send + Sync>;

pub fn get_model(config: &LLMModelConfig) -> Result<Arc<dyn LLMChatter>> {
  log::info!("Initializing LLM client for provider: {}, model: {}", config.provider, config.model_name);

  if get_model_info(&config.model_name).is_none() {
    log::warn!("Model {} is not in the catalogue, passing it through to {}", config.model_name, config.provider);
  }

  match config.provider {
    ModelProvider::Gemini => {
      return Ok(Arc::new(GeminiProvider::new()));
    }
    ModelProvider::Groq => {
      return Ok(Arc::new(GroqProvider::new()));
    }
  }
}

pub fn default_model_factory() -> ModelFactory {
  Arc::new(get_model)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalogue_is_grouped_by_provider() {
    let gemini = get_models_for(ModelProvider::Gemini);
    assert!(gemini.iter().any(|m| m.model_name == "gemini-1.5-flash"));
    assert!(gemini.iter().all(|m| m.provider == ModelProvider::Gemini));
    assert!(!get_models_for(ModelProvider::Groq).is_empty());
  }

  #[test]
  fn unknown_models_still_build_a_client() {
    let config = LLMModelConfig::new(ModelProvider::Groq, "some-new-model", "key");
    assert!(get_model(&config).is_ok());
  }
}
