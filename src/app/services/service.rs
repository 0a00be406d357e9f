use std::sync::Arc;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use futures::channel::mpsc::{self, UnboundedReceiver};
use polars::prelude::DataFrame;

use super::session_service::SessionService;
use crate::ai_agent::agents::chat::{ChatForwarder, ChatRender};
use crate::ai_agent::agents::narrative::NarrativeRequester;
use crate::ai_agent::data::cache::DerivationCache;
use crate::ai_agent::data::loader;
use crate::ai_agent::data::models::{DerivedTable, LiquidityRatios, MarkerSet};
use crate::ai_agent::llm::model_provider::{ChatMessage, Role};
use crate::ai_agent::session::state::StatementAnalysis;
use crate::ai_agent::tools::liquidity::liquidity;
use crate::ai_agent::utils::format::{DisplayRow, LiquidityDisplay};
use crate::app::error::AppError;

/// Everything the shell needs to show for one uploaded statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementReport {
  pub table: DerivedTable,
  pub rows: Vec<DisplayRow>,
  pub liquidity: LiquidityRatios,
  pub liquidity_display: LiquidityDisplay,
  pub notices: Vec<String>,
}

impl StatementReport {
  pub fn new(table: &DerivedTable, liquidity: &LiquidityRatios) -> Self {
    let notices: Vec<String> = table.notices.iter().chain(liquidity.notices.iter()).map(|n| n.to_string()).collect();
    StatementReport {
      rows: table.rows.iter().map(DisplayRow::from).collect(),
      liquidity_display: LiquidityDisplay::from(liquidity),
      table: table.clone(),
      liquidity: liquidity.clone(),
      notices,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeReport {
  pub narrative: String,
}

pub struct StatementServices {
  sessions: Arc<SessionService>,
  cache: DerivationCache,
  markers: MarkerSet,
}

impl StatementServices {

  pub fn new(sessions: Arc<SessionService>, markers: MarkerSet, cache_capacity: usize) -> Self {
    StatementServices { sessions, cache: DerivationCache::new(cache_capacity), markers }
  }

  pub fn sessions(&self) -> &Arc<SessionService> {
    &self.sessions
  }

  pub async fn upload_statement(&self, session_id: &str, bytes: &[u8]) -> Result<StatementReport, AppError> {
    self.sessions.get(session_id)?;
    let frame = loader::read_statement(bytes);
    self.analyze(session_id, frame).await
  }

  pub async fn upload_rows(&self, session_id: &str, rows: &[Vec<Value>]) -> Result<StatementReport, AppError> {
    self.sessions.get(session_id)?;
    let frame = loader::frame_from_json(rows);
    self.analyze(session_id, frame).await
  }

  /// Derives the table and liquidity pair and stores them as the session's current statement.
  /// A structural failure clears the previous statement: no derived table exists for a failed upload.
  async fn analyze(&self, session_id: &str, frame: Result<DataFrame, crate::ai_agent::data::error::StatementError>) -> Result<StatementReport, AppError> {
    let session = self.sessions.get(session_id)?;

    let derived = frame
      .and_then(|df| loader::line_items(&df))
      .and_then(|items| {
        log::info!("Session {}: deriving ratios for {} line items", session_id, items.len());
        self.cache.derive(&items, &self.markers)
      });

    let mut guard = session.lock().await;
    let table = match derived {
      Ok(table) => table,
      Err(e) => {
        log::warn!("Session {}: statement rejected: {}", session_id, e);
        guard.analysis = None;
        return Err(AppError::Structural(e));
      }
    };

    let ratios = liquidity(&table, &self.markers);
    let report = StatementReport::new(&table, &ratios);
    guard.analysis = Some(StatementAnalysis { table, liquidity: ratios });
    return Ok(report);
  }

  pub async fn request_narrative(&self, session_id: &str) -> Result<NarrativeReport, AppError> {
    let session = self.sessions.get(session_id)?;
    let (analysis, analyzer) = {
      let guard = session.lock().await;
      match &guard.analysis {
        Some(analysis) => (analysis.clone(), guard.analyzer.clone()),
        None => return Err(AppError::NoStatement),
      }
    };

    let narrative = NarrativeRequester::new(analyzer)
      .request_narrative(&analysis.table, &analysis.liquidity, &self.markers)
      .await;
    return Ok(NarrativeReport { narrative });
  }

  /// Starts one chat turn and returns its renders as they happen. The turn holds the session
  /// for its whole duration, so turns of one session never interleave. It runs to completion
  /// even if the receiver is dropped.
  pub fn chat(&self, session_id: &str, message: String) -> Result<UnboundedReceiver<ChatRender>, AppError> {
    let session = self.sessions.get(session_id)?;
    let (tx, rx) = mpsc::unbounded::<ChatRender>();

    tokio::spawn(async move {
      let mut guard = session.lock().await;
      let forwarder = ChatForwarder::new(guard.chat.clone());
      let reply = forwarder.send_chat(&mut guard.transcript, message, |render| {
        let _ = tx.unbounded_send(render);
      }).await;
      log::info!(
        "Session {}: chat turn finished ({} chars, {} replies in {} messages)",
        guard.id, reply.content.len(), guard.transcript.count(Role::Assistant), guard.transcript.len()
      );
    });

    return Ok(rx);
  }

  pub async fn transcript(&self, session_id: &str) -> Result<Vec<ChatMessage>, AppError> {
    let session = self.sessions.get(session_id)?;
    let guard = session.lock().await;
    return Ok(guard.transcript.messages().to_vec());
  }
}
