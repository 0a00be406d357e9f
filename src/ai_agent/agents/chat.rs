use serde::{Serialize, Deserialize};
use futures::StreamExt;

use crate::ai_agent::llm::error::LLMError;
use crate::ai_agent::llm::model_provider::ChatMessage;
use crate::ai_agent::session::state::{ModelHandle, Transcript};

/// Appended to the text while the reply is still streaming.
pub const CURSOR: &str = "▌";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
  InProgress,
  Final,
}

/// What the assistant bubble shows at one point of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRender {
  pub state: TurnState,
  pub display: String,
}

pub fn error_notice(error: &LLMError) -> String {
  format!("Sorry, an error occurred: {}", error)
}

fn with_notice(partial: String, error: &LLMError) -> String {
  if partial.is_empty() {
    return error_notice(error);
  }
  format!("{}\n\n{}", partial, error_notice(error))
}

pub struct ChatForwarder {
  model: ModelHandle,
}

impl ChatForwarder {
  pub fn new(model: ModelHandle) -> Self {
    ChatForwarder { model }
  }

  /// Runs one chat turn. The user message is recorded before the provider is called, every
  /// fragment triggers a render of the growing text, and exactly one assistant message is
  /// appended when the turn ends, whether the stream finished or failed.
  pub async fn send_chat<F>(&self, transcript: &mut Transcript, message: String, mut render: F) -> ChatMessage
  where
    F: FnMut(ChatRender),
  {
    transcript.push(ChatMessage::user(message.clone()));

    let mut full_response = String::new();
    match self.model.client.chat_stream(vec![ChatMessage::user(message)], &self.model.config).await {
      Ok(mut fragments) => {
        while let Some(fragment) = fragments.next().await {
          match fragment {
            Ok(text) => {
              full_response.push_str(&text);
              render(ChatRender { state: TurnState::InProgress, display: format!("{}{}", full_response, CURSOR) });
            }
            Err(e) => {
              log::error!("Chat stream failed after {} chars: {}", full_response.len(), e);
              full_response = with_notice(full_response, &e);
              break;
            }
          }
        }
      }
      Err(e) => {
        log::error!("Chat request failed: {}", e);
        full_response = error_notice(&e);
      }
    }

    render(ChatRender { state: TurnState::Final, display: full_response.clone() });
    let reply = ChatMessage::assistant(full_response);
    transcript.push(reply.clone());
    return reply;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ai_agent::llm::model_provider::{LLMModelConfig, ModelProvider, Role};
  use crate::ai_agent::testing::ScriptedChatter;
  use std::sync::Arc;

  fn forwarder(chatter: ScriptedChatter) -> ChatForwarder {
    ChatForwarder::new(ModelHandle {
      client: Arc::new(chatter),
      config: LLMModelConfig::new(ModelProvider::Gemini, "gemini-pro", "k"),
    })
  }

  #[tokio::test]
  async fn renders_growing_text_with_cursor() {
    let forwarder = forwarder(ScriptedChatter::streaming(vec![Ok("Hel".into()), Ok("lo".into())]));
    let mut transcript = Transcript::new();
    let mut renders = Vec::new();
    let reply = forwarder.send_chat(&mut transcript, "hi".into(), |r| renders.push(r)).await;

    assert_eq!(renders, vec![
      ChatRender { state: TurnState::InProgress, display: "Hel▌".into() },
      ChatRender { state: TurnState::InProgress, display: "Hello▌".into() },
      ChatRender { state: TurnState::Final, display: "Hello".into() },
    ]);
    assert_eq!(reply, ChatMessage::assistant("Hello"));
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript.messages()[1], ChatMessage::user("hi"));
  }

  #[tokio::test]
  async fn three_turns_grow_transcript_to_seven() {
    let forwarder = forwarder(ScriptedChatter::streaming(vec![Ok("answer".into())]));
    let mut transcript = Transcript::new();
    for turn in 0..3 {
      forwarder.send_chat(&mut transcript, format!("question {}", turn), |_| {}).await;
    }
    assert_eq!(transcript.len(), 7);
    let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]);
  }

  #[tokio::test]
  async fn mid_stream_error_keeps_partial_text() {
    let forwarder = forwarder(ScriptedChatter::streaming(vec![
      Ok("Partial".into()),
      Err(LLMError::Transport("reset".into())),
      Ok("never".into()),
    ]));
    let mut transcript = Transcript::new();
    let reply = forwarder.send_chat(&mut transcript, "q".into(), |_| {}).await;
    assert!(reply.content.starts_with("Partial\n\nSorry, an error occurred:"));
    assert!(!reply.content.contains("never"));
    assert_eq!(transcript.count(Role::Assistant), 2);
  }

  #[tokio::test]
  async fn failure_before_first_fragment_still_answers() {
    let forwarder = forwarder(ScriptedChatter::failing(LLMError::Unauthorized("bad key".into())));
    let mut transcript = Transcript::new();
    let mut renders = Vec::new();
    let reply = forwarder.send_chat(&mut transcript, "q".into(), |r| renders.push(r)).await;
    assert_eq!(reply.content, "Sorry, an error occurred: the provider rejected the API key: bad key");
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].state, TurnState::Final);
    assert_eq!(transcript.len(), 3);
  }

  #[tokio::test]
  async fn final_render_has_no_cursor() {
    let forwarder = forwarder(ScriptedChatter::streaming(vec![Ok("x".into())]));
    let mut transcript = Transcript::new();
    let mut last = None;
    forwarder.send_chat(&mut transcript, "q".into(), |r| last = Some(r)).await;
    let last = last.unwrap();
    assert_eq!(last.state, TurnState::Final);
    assert!(!last.display.ends_with(CURSOR));
  }
}
