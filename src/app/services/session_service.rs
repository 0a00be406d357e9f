use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use anyhow::anyhow;

use crate::ai_agent::llm::model_provider::{LLMModelConfig, ModelProvider};
use crate::ai_agent::llm::models::ModelFactory;
use crate::ai_agent::session::state::{KeySource, ModelHandle, Session, Transcript};
use crate::app::config::Config;
use crate::app::error::AppError;

pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
  pub session_id: String,
  pub created_at: DateTime<Utc>,
  pub key_source: KeySource,
  pub provider: ModelProvider,
  pub analyzer_model: String,
  pub chat_model: String,
  pub transcript: Transcript,
}

/// Picks the API key for a new session. A non-blank interactive key always wins over the configured one.
pub fn resolve_api_key(interactive: Option<&str>, configured: Option<&str>) -> Result<(String, KeySource), AppError> {
  if let Some(key) = interactive.map(str::trim).filter(|k| !k.is_empty()) {
    return Ok((key.to_string(), KeySource::Interactive));
  }
  if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
    return Ok((key.to_string(), KeySource::Configured));
  }
  Err(AppError::CredentialMissing)
}

struct SessionEntry {
  session: SharedSession,
  last_used: DateTime<Utc>,
}

pub struct SessionService {
  config: Config,
  model_factory: ModelFactory,
  sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionService {
  pub fn new(config: Config, model_factory: ModelFactory) -> Self {
    SessionService { config, model_factory, sessions: Mutex::new(HashMap::new()) }
  }

  fn is_idle(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
    self.config.session_idle_minutes > 0
      && now - entry.last_used > Duration::minutes(self.config.session_idle_minutes)
  }

  /// Drops every session nobody has used within the idle window.
  fn evict_idle(&self, sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) {
    let before = sessions.len();
    sessions.retain(|_, entry| !self.is_idle(entry, now));
    if sessions.len() < before {
      log::info!("Evicted {} idle sessions", before - sessions.len());
    }
  }

  fn model_handle(&self, model_name: &str, api_key: &str) -> Result<ModelHandle, AppError> {
    let config = LLMModelConfig::new(self.config.provider, model_name, api_key)
      .with_base_url(self.config.llm_base_url.clone());
    let client = (self.model_factory)(&config)?;
    Ok(ModelHandle { client, config })
  }

  pub fn start_session(&self, interactive_key: Option<&str>) -> Result<SessionSummary, AppError> {
    let (api_key, key_source) = resolve_api_key(interactive_key, self.config.configured_api_key())?;

    let analyzer = self.model_handle(&self.config.analyzer_model, &api_key)?;
    let chat = self.model_handle(&self.config.chat_model, &api_key)?;

    let id = uuid::Uuid::new_v4().to_string();
    let session = Session::new(id.clone(), key_source, analyzer, chat);
    let summary = SessionSummary {
      session_id: id.clone(),
      created_at: session.created_at,
      key_source: session.key_source,
      provider: self.config.provider,
      analyzer_model: self.config.analyzer_model.clone(),
      chat_model: self.config.chat_model.clone(),
      transcript: session.transcript.clone(),
    };

    {
      let mut sessions = self.sessions.lock().map_err(|e| anyhow!("session store poisoned: {}", e))?;
      let now = Utc::now();
      self.evict_idle(&mut sessions, now);
      sessions.insert(id.clone(), SessionEntry { session: Arc::new(tokio::sync::Mutex::new(session)), last_used: now });
    }
    log::info!("Started session {} using the {:?} API key ({} active)", id, key_source, self.len());
    return Ok(summary);
  }

  /// Looks the session up and marks it as used. A session past its idle window is dropped here.
  pub fn get(&self, id: &str) -> Result<SharedSession, AppError> {
    let mut sessions = self.sessions.lock().map_err(|e| anyhow!("session store poisoned: {}", e))?;
    let now = Utc::now();
    let idle = match sessions.get(id) {
      Some(entry) => self.is_idle(entry, now),
      None => return Err(AppError::SessionNotFound(id.to_string())),
    };
    if idle {
      sessions.remove(id);
      log::info!("Session {} expired after {} idle minutes", id, self.config.session_idle_minutes);
      return Err(AppError::SessionNotFound(id.to_string()));
    }
    match sessions.get_mut(id) {
      Some(entry) => {
        entry.last_used = now;
        Ok(entry.session.clone())
      }
      None => Err(AppError::SessionNotFound(id.to_string())),
    }
  }

  /// Drops the session and everything it owns (transcript, uploaded statement).
  pub fn end_session(&self, id: &str) -> Result<(), AppError> {
    let removed = self.sessions.lock().map_err(|e| anyhow!("session store poisoned: {}", e))?.remove(id);
    match removed {
      Some(_) => {
        log::info!("Ended session {}", id);
        Ok(())
      }
      None => Err(AppError::SessionNotFound(id.to_string())),
    }
  }

  pub fn len(&self) -> usize {
    self.sessions.lock().map(|s| s.len()).unwrap_or(0)
  }
}
