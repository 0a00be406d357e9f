use crate::ai_agent::data::models::{DerivedTable, LiquidityRatios, MarkerSet};
use crate::ai_agent::llm::error::LLMError;
use crate::ai_agent::llm::model_provider::ChatMessage;
use crate::ai_agent::session::state::ModelHandle;
use crate::ai_agent::utils::format::{derived_table_markdown, format_pct};

const ANALYST_INSTRUCTIONS: &str = "You are a professional financial analyst. Based on the financial indicators below, \
give an objective, concise assessment (about 3-4 paragraphs) of the company's financial position. \
Focus on growth rates, changes in the asset structure and the current ratio.";

/// Builds the narrative prompt: the full derived table followed by the headline indicators.
pub fn build_prompt(derived: &DerivedTable, liquidity: &LiquidityRatios, markers: &MarkerSet) -> String {
  let short_term_growth = derived.find(&markers.short_term_assets)
    .map(|row| format_pct(row.growth_pct))
    .unwrap_or_else(|| "N/A".to_string());

  format!(
    "{instructions}\n\n\
Raw data and indicators:\n\n\
Full analysis table:\n{table}\n\
| Indicator | Value |\n\
|:--|--:|\n\
| Short-term asset growth (%) | {growth} |\n\
| Current ratio (prior period) | {prior} |\n\
| Current ratio (current period) | {current} |\n",
    instructions = ANALYST_INSTRUCTIONS,
    table = derived_table_markdown(derived),
    growth = short_term_growth,
    prior = liquidity.prior,
    current = liquidity.current,
  )
}

/// The text shown in place of a narrative when the provider call fails.
pub fn describe_failure(error: &LLMError) -> String {
  match error {
    LLMError::RateLimited(_) | LLMError::Unauthorized(_) =>
      format!("Error calling the AI service: please check the API key or usage limits. Details: {}", error),
    _ => format!("An unexpected error occurred while requesting the analysis: {}", error),
  }
}

pub struct NarrativeRequester {
  model: ModelHandle,
}

impl NarrativeRequester {
  pub fn new(model: ModelHandle) -> Self {
    NarrativeRequester { model }
  }

  /// One call to the provider, no retry. Failures come back as display text, never as an error.
  pub async fn request_narrative(&self, derived: &DerivedTable, liquidity: &LiquidityRatios, markers: &MarkerSet) -> String {
    let prompt = build_prompt(derived, liquidity, markers);
    log::info!("Requesting narrative from {} ({} prompt chars)", self.model.config.model_name, prompt.len());

    match self.model.client.chat(vec![ChatMessage::user(prompt)], &self.model.config).await {
      Ok(response) => response.content,
      Err(e) => {
        log::error!("Narrative request failed: {}", e);
        describe_failure(&e)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ai_agent::data::models::LineItem;
  use crate::ai_agent::llm::model_provider::{LLMModelConfig, ModelProvider};
  use crate::ai_agent::testing::ScriptedChatter;
  use crate::ai_agent::tools::{liquidity::liquidity, ratios::derive};
  use std::sync::Arc;

  fn analysis(rows: Vec<LineItem>) -> (DerivedTable, LiquidityRatios) {
    let table = derive(&rows, &MarkerSet::english()).unwrap();
    let ratios = liquidity(&table, &MarkerSet::english());
    (table, ratios)
  }

  fn reference() -> (DerivedTable, LiquidityRatios) {
    analysis(vec![
      LineItem::new("TOTAL ASSETS", 1000.0, 1200.0),
      LineItem::new("SHORT-TERM ASSETS", 400.0, 500.0),
      LineItem::new("SHORT-TERM LIABILITIES", 200.0, 250.0),
    ])
  }

  fn handle(chatter: Arc<ScriptedChatter>) -> ModelHandle {
    ModelHandle { client: chatter, config: LLMModelConfig::new(ModelProvider::Gemini, "gemini-1.5-flash", "k") }
  }

  #[test]
  fn prompt_embeds_table_and_ratios() {
    let (table, ratios) = reference();
    let prompt = build_prompt(&table, &ratios, &MarkerSet::english());
    assert!(prompt.contains("| TOTAL ASSETS | 1,000 | 1,200 | 20.00% | 100.00% | 100.00% |"));
    assert!(prompt.contains("| Short-term asset growth (%) | 25.00% |"));
    assert!(prompt.contains("| Current ratio (prior period) | 2.00 |"));
    assert!(prompt.contains("| Current ratio (current period) | 2.00 |"));
    let total = prompt.find("| TOTAL ASSETS |").unwrap();
    let short = prompt.find("| SHORT-TERM ASSETS |").unwrap();
    assert!(total < short);
  }

  #[test]
  fn unavailable_ratios_render_as_na() {
    let (table, ratios) = analysis(vec![LineItem::new("TOTAL ASSETS", 1.0, 1.0)]);
    let prompt = build_prompt(&table, &ratios, &MarkerSet::english());
    assert!(prompt.contains("| Short-term asset growth (%) | N/A |"));
    assert!(prompt.contains("| Current ratio (prior period) | N/A |"));
  }

  #[tokio::test]
  async fn returns_provider_text() {
    let chatter = Arc::new(ScriptedChatter::replying("Solid liquidity."));
    let (table, ratios) = reference();
    let narrative = NarrativeRequester::new(handle(chatter.clone())).request_narrative(&table, &ratios, &MarkerSet::english()).await;
    assert_eq!(narrative, "Solid liquidity.");
    assert_eq!(chatter.calls(), 1);
  }

  #[tokio::test]
  async fn provider_errors_become_text() {
    let chatter = Arc::new(ScriptedChatter::failing(LLMError::RateLimited("quota".into())));
    let (table, ratios) = reference();
    let narrative = NarrativeRequester::new(handle(chatter)).request_narrative(&table, &ratios, &MarkerSet::english()).await;
    assert!(narrative.starts_with("Error calling the AI service"));
    assert!(narrative.contains("quota"));
  }

  #[tokio::test]
  async fn identical_requests_are_not_cached() {
    let chatter = Arc::new(ScriptedChatter::replying("ok"));
    let requester = NarrativeRequester::new(handle(chatter.clone()));
    let (table, ratios) = reference();
    requester.request_narrative(&table, &ratios, &MarkerSet::english()).await;
    requester.request_narrative(&table, &ratios, &MarkerSet::english()).await;
    assert_eq!(chatter.calls(), 2);
  }
}
