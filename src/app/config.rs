use std::env;
use std::str::FromStr;

use crate::ai_agent::data::models::MarkerSet;
use crate::ai_agent::llm::model_provider::ModelProvider;

#[derive(Clone, Debug)]
pub struct Config {
  pub google_api_key: Option<String>,
  pub groq_api_key: Option<String>,
  pub provider: ModelProvider,
  pub analyzer_model: String,
  pub chat_model: String,
  pub llm_base_url: Option<String>,
  pub markers: MarkerSet,
  pub bind_address: String,
  pub port: u16,
  pub cache_capacity: usize,
  /// Sessions unused for longer than this are dropped. 0 keeps them until ended.
  pub session_idle_minutes: i64,
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
  match raw {
    None => default,
    Some(value) => match value.parse::<T>() {
      Ok(parsed) => parsed,
      Err(_) => {
        log::warn!("Invalid value for {}: {:?}, using the default", name, value);
        default
      }
    },
  }
}

impl Config {

  pub fn load() -> Self {
    match dotenv::dotenv() {
      Ok(_) => log::info!("Loaded .env file"),
      Err(_) => log::info!("No .env file found, reading the environment only"),
    }
    Config::from_lookup(|name| env::var(name).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Self where F: Fn(&str) -> Option<String> {
    let get = |name: &str| non_empty(lookup(name));

    let provider: ModelProvider = parse_or("LLM_PROVIDER", get("LLM_PROVIDER"), ModelProvider::Gemini);
    let (default_analyzer, default_chat) = match provider {
      ModelProvider::Gemini => ("gemini-1.5-flash", "gemini-pro"),
      ModelProvider::Groq => ("llama3-8b-8192", "llama3-70b-8192"),
    };

    let config = Config {
      google_api_key: get("GOOGLE_API_KEY"),
      groq_api_key: get("GROQ_API_KEY"),
      provider,
      analyzer_model: get("ANALYZER_MODEL").unwrap_or_else(|| default_analyzer.to_string()),
      chat_model: get("CHAT_MODEL").unwrap_or_else(|| default_chat.to_string()),
      llm_base_url: get("LLM_BASE_URL"),
      markers: parse_or("STATEMENT_MARKERS", get("STATEMENT_MARKERS"), MarkerSet::english()),
      bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string()),
      port: parse_or("PORT", get("PORT"), 8080),
      cache_capacity: parse_or("DERIVATION_CACHE_CAPACITY", get("DERIVATION_CACHE_CAPACITY"), 64),
      session_idle_minutes: parse_or::<i64>("SESSION_IDLE_MINUTES", get("SESSION_IDLE_MINUTES"), 60).clamp(0, 1_000_000),
    };

    if config.configured_api_key().is_none() {
      log::warn!("No configured API key for {}; sessions must supply one", config.provider);
    }
    return config;
  }

  /// The key provisioned for the selected provider, if any.
  pub fn configured_api_key(&self) -> Option<&str> {
    match self.provider {
      ModelProvider::Gemini => self.google_api_key.as_deref(),
      ModelProvider::Groq => self.groq_api_key.as_deref(),
    }
  }
}
